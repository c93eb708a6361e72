//! Learning summaries, produced by a stand-in for an external analysis
//! service.
//!
//! The generator waits a fixed latency and then returns canned strengths and
//! recommendations; only the counts and the level come from the session.
//! [`SummaryDispatcher`] runs requests as background tasks so the caller can
//! keep handling input while one is in flight.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{EngineError, GridPosition};

pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1500);
pub const DEFAULT_REPORTED_TOTAL: usize = 25;
pub const PLACEHOLDER_NEXT_OPTIMAL: GridPosition = GridPosition::new(10, 10);

const STRENGTHS: [&str; 3] = [
    "Strong understanding of foundational concepts",
    "Good problem-solving approach",
    "Consistent learning pattern",
];

const RECOMMENDATIONS: [&str; 3] = [
    "Focus on advanced topics to improve efficiency",
    "Practice more challenging exercises",
    "Review weaker areas identified by the system",
];

/// A snapshot report of the learner's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningSummary {
    pub total_resources: usize,
    pub visited_resources: usize,
    pub current_level: u32,
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_optimal_resource: Option<GridPosition>,
}

impl LearningSummary {
    /// What the front end shows before any summary has been requested.
    pub fn initial(total_resources: usize) -> Self {
        Self {
            total_resources,
            visited_resources: 0,
            current_level: 1,
            strengths: Vec::new(),
            recommendations: Vec::new(),
            next_optimal_resource: None,
        }
    }
}

/// Inputs captured from the session when a summary is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryRequest {
    pub visited_resources: usize,
    /// Agent level at request time; later level changes do not leak in.
    pub current_level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryGenerator {
    latency: Duration,
    reported_total_resources: usize,
}

impl Default for SummaryGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY, DEFAULT_REPORTED_TOTAL)
    }
}

impl SummaryGenerator {
    pub fn new(latency: Duration, reported_total_resources: usize) -> Self {
        Self {
            latency,
            reported_total_resources,
        }
    }

    /// Waits the simulated latency, then builds the summary.
    pub async fn generate(&self, request: SummaryRequest) -> LearningSummary {
        tokio::time::sleep(self.latency).await;
        self.compose(request)
    }

    /// Builds the summary immediately.
    ///
    /// `total_resources` is the configured figure, not the catalog size.
    pub fn compose(&self, request: SummaryRequest) -> LearningSummary {
        LearningSummary {
            total_resources: self.reported_total_resources,
            visited_resources: request.visited_resources,
            current_level: request.current_level,
            strengths: STRENGTHS.iter().map(|s| s.to_string()).collect(),
            recommendations: RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
            next_optimal_resource: Some(PLACEHOLDER_NEXT_OPTIMAL),
        }
    }
}

/// Identifies one summary request. Later requests have larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

type SummaryOutcome = (RequestToken, Result<LearningSummary, EngineError>);

/// Runs summary requests in the background, one at a time.
///
/// Issuing a new request aborts the pending one, and any result that still
/// slips through carries a stale token and is dropped, so the newest request
/// always wins. Dropping the dispatcher aborts whatever is in flight.
///
/// `request` spawns onto the current tokio runtime and must be called from
/// within one.
#[derive(Debug)]
pub struct SummaryDispatcher {
    generator: SummaryGenerator,
    timeout: Option<Duration>,
    next_token: u64,
    pending: Option<(RequestToken, JoinHandle<()>)>,
    tx: UnboundedSender<SummaryOutcome>,
    rx: UnboundedReceiver<SummaryOutcome>,
}

impl SummaryDispatcher {
    pub fn new(generator: SummaryGenerator, timeout: Option<Duration>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            generator,
            timeout,
            next_token: 0,
            pending: None,
            tx,
            rx,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_token(&self) -> Option<RequestToken> {
        self.pending.as_ref().map(|(token, _)| *token)
    }

    /// Starts a request, superseding any pending one.
    pub fn request(&mut self, request: SummaryRequest) -> RequestToken {
        self.cancel();

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        let generator = self.generator;
        let timeout = self.timeout;
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, generator.generate(request))
                    .await
                    .map_err(|_| EngineError::SummaryTimedOut(limit)),
                None => Ok(generator.generate(request).await),
            };
            // The receiver lives as long as the dispatcher.
            let _ = tx.send((token, result));
        });

        info!(token = token.0, ?request, "summary requested");
        self.pending = Some((token, handle));
        token
    }

    /// Aborts the pending request, if any.
    pub fn cancel(&mut self) {
        if let Some((token, handle)) = self.pending.take() {
            handle.abort();
            warn!(token = token.0, "pending summary request cancelled");
        }
    }

    /// Returns the result of the pending request if it has finished.
    pub fn poll(&mut self) -> Option<Result<LearningSummary, EngineError>> {
        while let Ok((token, result)) = self.rx.try_recv() {
            if let Some(result) = self.accept(token, result) {
                return Some(result);
            }
        }
        None
    }

    /// Waits for the pending request to finish. Returns `None` if nothing
    /// is pending.
    pub async fn wait(&mut self) -> Option<Result<LearningSummary, EngineError>> {
        while self.pending.is_some() {
            let (token, result) = self.rx.recv().await?;
            if let Some(result) = self.accept(token, result) {
                return Some(result);
            }
        }
        None
    }

    fn accept(
        &mut self,
        token: RequestToken,
        result: Result<LearningSummary, EngineError>,
    ) -> Option<Result<LearningSummary, EngineError>> {
        if self.pending_token() == Some(token) {
            self.pending = None;
            Some(result)
        } else {
            debug!(token = token.0, "discarding superseded summary");
            None
        }
    }
}

impl Drop for SummaryDispatcher {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    fn request(visited_resources: usize, current_level: u32) -> SummaryRequest {
        SummaryRequest {
            visited_resources,
            current_level,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn generate_waits_the_simulated_latency() {
        let generator = SummaryGenerator::default();
        let started = Instant::now();
        let summary = generator.generate(request(0, 1)).await;
        assert!(started.elapsed() >= DEFAULT_LATENCY);
        assert_eq!(summary.visited_resources, 0);
        assert_eq!(summary.current_level, 1);
        assert_eq!(summary.total_resources, DEFAULT_REPORTED_TOTAL);
        assert!(!summary.strengths.is_empty());
        assert!(!summary.recommendations.is_empty());
        assert_eq!(summary.next_optimal_resource, Some(PLACEHOLDER_NEXT_OPTIMAL));
    }

    #[tokio::test(start_paused = true)]
    async fn newest_request_wins() {
        let mut dispatcher = SummaryDispatcher::new(SummaryGenerator::default(), None);
        let first = dispatcher.request(request(1, 1));
        let second = dispatcher.request(request(2, 3));
        assert!(second > first);

        let summary = dispatcher.wait().await.unwrap().unwrap();
        assert_eq!(summary.visited_resources, 2);
        assert_eq!(summary.current_level, 3);
        assert!(!dispatcher.is_pending());

        tokio::time::sleep(DEFAULT_LATENCY * 2).await;
        assert!(dispatcher.poll().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_is_empty_until_the_latency_elapses() {
        let mut dispatcher = SummaryDispatcher::new(SummaryGenerator::default(), None);
        dispatcher.request(request(4, 2));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(dispatcher.poll().is_none());
        assert!(dispatcher.is_pending());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let summary = dispatcher.poll().unwrap().unwrap();
        assert_eq!(summary.visited_resources, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_requests_time_out() {
        let generator = SummaryGenerator::new(Duration::from_secs(5), 25);
        let mut dispatcher = SummaryDispatcher::new(generator, Some(Duration::from_secs(1)));
        dispatcher.request(request(0, 1));
        let outcome = dispatcher.wait().await.unwrap();
        assert_eq!(
            outcome,
            Err(EngineError::SummaryTimedOut(Duration::from_secs(1)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_clears_the_pending_request() {
        let mut dispatcher = SummaryDispatcher::new(SummaryGenerator::default(), None);
        dispatcher.request(request(1, 1));
        dispatcher.cancel();
        assert!(dispatcher.wait().await.is_none());
        tokio::time::sleep(DEFAULT_LATENCY * 2).await;
        assert!(dispatcher.poll().is_none());
    }
}
