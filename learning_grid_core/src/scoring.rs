//! Target selection: which unvisited resource the agent should pursue next.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{GridPosition, Resource, ResourceId};

/// How a candidate resource is scored against its distance from the agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// `reward / (distance + 1)`
    #[default]
    Ratio,
    /// `reward - 0.5 * distance`
    LinearPenalty,
}

impl ScoringPolicy {
    pub fn score(&self, reward: u32, distance: usize) -> f64 {
        let reward = f64::from(reward);
        let distance = distance as f64;
        match self {
            ScoringPolicy::Ratio => reward / (distance + 1.0),
            ScoringPolicy::LinearPenalty => reward - 0.5 * distance,
        }
    }
}

/// A scored candidate. Borrowed from the catalog.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub resource: &'a Resource,
    pub distance: usize,
    pub score: f64,
}

/// Scores every unvisited resource, in catalog order.
pub fn candidates<'a>(
    current: GridPosition,
    resources: &'a [Resource],
    visited: &HashSet<ResourceId>,
    policy: ScoringPolicy,
) -> impl Iterator<Item = Candidate<'a>> {
    resources
        .iter()
        .filter(move |r| !r.visited && !visited.contains(&r.id))
        .map(move |resource| {
            let distance = current.manhattan_distance(&resource.position);
            Candidate {
                resource,
                distance,
                score: policy.score(resource.reward, distance),
            }
        })
}

/// Picks the best unvisited resource for an agent standing on `current`.
///
/// Returns `None` once every resource has been visited. Equal scores keep
/// the earliest resource in catalog order.
pub fn select_target<'a>(
    current: GridPosition,
    resources: &'a [Resource],
    policy: ScoringPolicy,
) -> Option<&'a Resource> {
    select_target_excluding(current, resources, &HashSet::new(), policy)
}

/// Like [`select_target`], additionally skipping ids in `visited`.
pub fn select_target_excluding<'a>(
    current: GridPosition,
    resources: &'a [Resource],
    visited: &HashSet<ResourceId>,
    policy: ScoringPolicy,
) -> Option<&'a Resource> {
    let mut best: Option<Candidate<'a>> = None;
    for candidate in candidates(current, resources, visited, policy) {
        // strict comparison keeps the first of equal scores
        if best.is_none_or(|b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }

    if let Some(choice) = &best {
        debug!(
            target_id = %choice.resource.id,
            score = choice.score,
            distance = choice.distance,
            ?policy,
            "selected target"
        );
    }
    best.map(|c| c.resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceCategory;

    fn res(id: &str, x: usize, y: usize, reward: u32) -> Resource {
        Resource::new(
            id,
            GridPosition::new(x, y),
            ResourceCategory::Book,
            id.to_uppercase(),
            1,
            reward,
        )
    }

    #[test]
    fn ratio_prefers_high_reward_per_step() {
        let resources = vec![res("a", 3, 9, 50), res("b", 1, 9, 10)];
        let chosen = select_target(GridPosition::new(0, 9), &resources, ScoringPolicy::Ratio);
        assert_eq!(chosen.map(|r| r.id.as_str()), Some("a"));
        assert_eq!(ScoringPolicy::Ratio.score(50, 3), 12.5);
        assert_eq!(ScoringPolicy::Ratio.score(10, 1), 5.0);
    }

    #[test]
    fn policies_can_disagree() {
        // ratio: near = 20/2 = 10, far = 100/21 ~ 4.8
        // linear: near = 19.5, far = 90
        let resources = vec![res("near", 1, 0, 20), res("far", 20, 0, 100)];
        let start = GridPosition::new(0, 0);
        let ratio = select_target(start, &resources, ScoringPolicy::Ratio);
        let linear = select_target(start, &resources, ScoringPolicy::LinearPenalty);
        assert_eq!(ratio.map(|r| r.id.as_str()), Some("near"));
        assert_eq!(linear.map(|r| r.id.as_str()), Some("far"));
    }

    #[test]
    fn ties_keep_catalog_order() {
        let resources = vec![res("left", 0, 2, 30), res("right", 2, 0, 30)];
        let chosen = select_target(GridPosition::new(0, 0), &resources, ScoringPolicy::Ratio);
        assert_eq!(chosen.map(|r| r.id.as_str()), Some("left"));
    }

    #[test]
    fn never_returns_visited_resources() {
        let mut resources = vec![res("a", 3, 9, 50), res("b", 1, 9, 10), res("c", 5, 5, 5)];
        resources[0].visited = true;
        let visited: HashSet<ResourceId> = [ResourceId::from("b")].into_iter().collect();
        for policy in [ScoringPolicy::Ratio, ScoringPolicy::LinearPenalty] {
            let chosen =
                select_target_excluding(GridPosition::new(0, 9), &resources, &visited, policy);
            assert_eq!(chosen.map(|r| r.id.as_str()), Some("c"));
        }
    }

    #[test]
    fn exhausted_catalog_yields_none() {
        let mut resources = vec![res("a", 3, 9, 50)];
        resources[0].visited = true;
        assert!(select_target(GridPosition::new(0, 0), &resources, ScoringPolicy::Ratio).is_none());
        assert!(select_target(GridPosition::new(0, 0), &[], ScoringPolicy::Ratio).is_none());
    }
}
