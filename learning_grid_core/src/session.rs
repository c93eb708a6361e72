use std::future::Future;

use rand::{SeedableRng, rngs::StdRng};
use tracing::{info, warn};

use crate::{
    EngineError, GridPosition, Resource, ResourceId,
    agent::LearnerAgent,
    catalog::Catalog,
    config::EngineConfig,
    planner::{self, StepPolicy},
    polyline::{self, Polyline, RouteSet},
    scoring,
    summary::{LearningSummary, RequestToken, SummaryDispatcher, SummaryRequest},
};

/// One interactive simulation: a catalog, the learner and everything derived
/// from them.
///
/// Sessions are independent values; nothing is shared between them. All
/// mutation goes through `&mut self`, so each command is applied completely
/// before the next one starts.
#[derive(Debug)]
pub struct Session {
    config: EngineConfig,
    catalog: Catalog,
    agent: LearnerAgent,
    routes: RouteSet,
    summary: LearningSummary,
    rng: StdRng,
    summaries: SummaryDispatcher,
    summary_routes: usize,
    /// Annotation for the summary route of a pending reflection request.
    pending_reflection: Option<(RequestToken, String)>,
}

impl Session {
    /// Starts a session over `resources`. Every resource starts unvisited.
    pub fn new(config: EngineConfig, resources: Vec<Resource>) -> Result<Self, EngineError> {
        config.validate()?;
        let bounds = config.bounds();
        let resources = resources
            .into_iter()
            .map(|mut r| {
                r.visited = false;
                r
            })
            .collect();
        let catalog = Catalog::new(resources, bounds)?;
        let agent = LearnerAgent::new(config.start, bounds)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let summaries = SummaryDispatcher::new(config.summary_generator(), config.summary_timeout());

        info!(
            width = bounds.width,
            height = bounds.height,
            resources = catalog.len(),
            scoring = ?config.scoring,
            stepping = ?config.stepping,
            "session started"
        );

        Ok(Self {
            summary: LearningSummary::initial(catalog.len()),
            config,
            catalog,
            agent,
            routes: RouteSet::new(),
            rng,
            summaries,
            summary_routes: 0,
            pending_reflection: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn agent(&self) -> &LearnerAgent {
        &self.agent
    }

    pub fn routes(&self) -> &RouteSet {
        &self.routes
    }

    /// The most recently applied summary.
    pub fn summary(&self) -> &LearningSummary {
        &self.summary
    }

    pub fn resource_at(&self, position: GridPosition) -> Option<&Resource> {
        self.catalog.at(position)
    }

    /// Titles of visited resources, in visit order.
    pub fn learning_path(&self) -> Vec<&str> {
        self.visited_in_order()
            .into_iter()
            .map(|r| r.title.as_str())
            .collect()
    }

    fn visited_in_order(&self) -> Vec<&Resource> {
        self.catalog.in_visit_order(self.agent.visited())
    }

    fn resource(&self, id: &ResourceId) -> Result<&Resource, EngineError> {
        self.catalog
            .get(id)
            .ok_or_else(|| EngineError::UnknownResource(id.clone()))
    }

    /// Moves the agent to `position`. Off-grid positions are rejected.
    pub fn move_agent(&mut self, position: GridPosition) -> Result<(), EngineError> {
        if let Err(e) = self.agent.move_to(position) {
            warn!(%position, "rejected agent move: {e}");
            return Err(e.into());
        }
        info!(%position, "agent moved");
        Ok(())
    }

    /// Marks `id` visited and credits its reward, without moving the agent.
    ///
    /// Returns `false` if it was already visited.
    pub fn visit_resource(&mut self, id: &ResourceId) -> Result<bool, EngineError> {
        let resource = self.resource(id)?.clone();
        self.catalog.mark_visited(id);
        let first = self.agent.record_visit(&resource);
        if first {
            info!(
                resource = %id,
                title = %resource.title,
                total_reward = self.agent.total_reward(),
                level = self.agent.level(),
                "resource visited"
            );
        }
        Ok(first)
    }

    /// A click on a resource: visit it, move onto it and count it in the
    /// displayed summary. Clicking a visited resource changes nothing.
    pub fn click_resource(&mut self, id: &ResourceId) -> Result<bool, EngineError> {
        let resource = self.resource(id)?;
        if resource.visited {
            return Ok(false);
        }
        let position = resource.position;
        self.visit_resource(id)?;
        self.move_agent(position)?;
        self.summary.visited_resources += 1;
        Ok(true)
    }

    /// The resource the agent should pursue next, if any remain.
    pub fn recommended_target(&self) -> Option<&Resource> {
        scoring::select_target_excluding(
            self.agent.position(),
            self.catalog.resources(),
            self.agent.visited_set(),
            self.config.scoring,
        )
    }

    /// Path from the agent to the recommended target. Just the agent's own
    /// cell once every resource has been visited.
    pub fn recommended_path(&self) -> Result<Vec<GridPosition>, EngineError> {
        Ok(planner::plan_to(
            self.agent.position(),
            self.recommended_target(),
            self.stepping(),
            &self.config.bounds(),
        )?)
    }

    /// The first cell of the recommended path after the agent's own.
    pub fn next_step(&self) -> GridPosition {
        planner::next_step(
            self.agent.position(),
            self.recommended_target(),
            self.stepping(),
        )
    }

    /// Multi-target path through the top-ranked unvisited resources.
    pub fn simulation_path(&self) -> Result<Vec<GridPosition>, EngineError> {
        Ok(planner::plan_tour(
            self.agent.position(),
            self.catalog.resources(),
            self.agent.visited_set(),
            self.stepping(),
            &self.config.bounds(),
        )?)
    }

    /// Plans the simulation path and shows it, replacing any earlier one.
    pub fn start_simulation(&mut self) -> Result<Vec<GridPosition>, EngineError> {
        let path = self.simulation_path()?;
        info!(steps = path.len() - 1, "simulation path planned");
        self.routes
            .upsert(polyline::build_simulation_polyline(path.clone()));
        Ok(path)
    }

    fn stepping(&self) -> StepPolicy {
        self.config.stepping
    }

    /// Route through visited resources in visit order, if there are two or
    /// more.
    pub fn current_path_polyline(&self) -> Option<Polyline> {
        polyline::build_current_path_polyline(&self.visited_in_order())
    }

    /// Builds a new summary route over the visited resources. Colour and
    /// confidence come from the session's random source.
    pub fn summary_polyline(&mut self, title: Option<&str>, annotation: Option<String>) -> Polyline {
        self.summary_routes += 1;
        let n = self.summary_routes;
        let default_title = format!("Learning Summary {n}");
        let visited: Vec<&Resource> = self.catalog.visited().collect();
        polyline::build_summary_polyline(
            format!("summary-{n}"),
            &visited,
            Some(title.unwrap_or(default_title.as_str())),
            annotation,
            &mut self.rng,
        )
    }

    /// Makes `id` the only active route.
    pub fn show_route(&mut self, id: &str) -> Result<(), EngineError> {
        if self.routes.show(id) {
            Ok(())
        } else {
            Err(EngineError::UnknownRoute(id.to_string()))
        }
    }

    fn summary_request(&self) -> SummaryRequest {
        SummaryRequest {
            visited_resources: self.catalog.visited().count(),
            current_level: self.agent.level(),
        }
    }

    /// Produces a summary after the simulated latency.
    ///
    /// The returned future owns its inputs, captured now; it does not update
    /// the session. Use [`Session::request_summary`] for the managed variant.
    pub fn generate_summary(&self) -> impl Future<Output = LearningSummary> + Send + use<> {
        let generator = self.config.summary_generator();
        let request = self.summary_request();
        async move { generator.generate(request).await }
    }

    /// Starts a background summary, superseding any pending one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_summary(&mut self) -> RequestToken {
        if let Some((token, _)) = self.pending_reflection.take() {
            warn!(?token, "reflection superseded by a new summary request");
        }
        self.summaries.request(self.summary_request())
    }

    /// Starts a summary for a written reflection. When it completes, a
    /// summary route annotated with the text is added and the agent takes
    /// one step along its recommended path.
    pub fn submit_reflection(
        &mut self,
        summary_text: &str,
        reflection_text: &str,
    ) -> Result<RequestToken, EngineError> {
        let (summary_text, reflection_text) = (summary_text.trim(), reflection_text.trim());
        if summary_text.is_empty() || reflection_text.is_empty() {
            return Err(EngineError::EmptyReflection);
        }
        let token = self.request_summary();
        self.pending_reflection = Some((
            token,
            format!("Summary: {summary_text}\nReflection: {reflection_text}"),
        ));
        Ok(token)
    }

    pub fn summary_pending(&self) -> bool {
        self.summaries.is_pending()
    }

    /// Aborts the pending summary, if any.
    pub fn cancel_summary(&mut self) {
        self.summaries.cancel();
        self.pending_reflection = None;
    }

    /// Applies the pending summary if it has finished.
    pub fn poll_summary(&mut self) -> Option<Result<(), EngineError>> {
        let token = self.summaries.pending_token()?;
        let outcome = self.summaries.poll()?;
        Some(self.finish_summary(token, outcome))
    }

    /// Waits for the pending summary and applies it.
    pub async fn wait_summary(&mut self) -> Option<Result<(), EngineError>> {
        let token = self.summaries.pending_token()?;
        let outcome = self.summaries.wait().await?;
        Some(self.finish_summary(token, outcome))
    }

    fn finish_summary(
        &mut self,
        token: RequestToken,
        outcome: Result<LearningSummary, EngineError>,
    ) -> Result<(), EngineError> {
        let reflection = match self.pending_reflection.take() {
            Some((pending, text)) if pending == token => Some(text),
            _ => None,
        };
        let summary = outcome?;
        self.apply_summary(summary);

        if let Some(text) = reflection {
            let route = self.summary_polyline(None, Some(text));
            info!(route = %route.id, "summary route added");
            self.routes.push(route);
            // Steps towards the best unvisited target in the whole catalog,
            // not along the route through visited resources.
            let next = self.next_step();
            if next != self.agent.position() {
                self.move_agent(next)?;
            }
        }
        Ok(())
    }

    /// Replaces the displayed summary and refreshes the current-path route.
    pub fn apply_summary(&mut self, summary: LearningSummary) {
        info!(
            visited = summary.visited_resources,
            level = summary.current_level,
            "summary applied"
        );
        self.summary = summary;
        if let Some(current) = self.current_path_polyline() {
            self.routes.upsert(current);
        }
    }
}
