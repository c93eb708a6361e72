use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::{
    GridPosition, Resource, ResourceId,
    grid::{GridBounds, GridError},
};

/// Reward needed to gain one level.
pub const REWARD_PER_LEVEL: u32 = 100;

/// Level reached with `total_reward` accumulated.
pub fn level_for(total_reward: u32) -> u32 {
    total_reward / REWARD_PER_LEVEL + 1
}

/// The learner moving across the grid.
///
/// Position and progress change independently: `move_to` never touches the
/// reward, and `record_visit` never moves the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearnerAgent {
    position: GridPosition,
    bounds: GridBounds,
    level: u32,
    total_reward: u32,
    /// Ids in visit order.
    visited: Vec<ResourceId>,
    #[serde(skip)]
    visited_set: HashSet<ResourceId>,
}

impl LearnerAgent {
    pub fn new(start: GridPosition, bounds: GridBounds) -> Result<Self, GridError> {
        Ok(Self {
            position: bounds.check(start)?,
            bounds,
            level: 1,
            total_reward: 0,
            visited: Vec::new(),
            visited_set: HashSet::new(),
        })
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn total_reward(&self) -> u32 {
        self.total_reward
    }

    /// Visited resource ids, oldest first.
    pub fn visited(&self) -> &[ResourceId] {
        &self.visited
    }

    pub fn visited_set(&self) -> &HashSet<ResourceId> {
        &self.visited_set
    }

    /// Moves the agent. Positions off the grid are rejected and leave the
    /// agent where it was.
    pub fn move_to(&mut self, position: GridPosition) -> Result<(), GridError> {
        self.position = self.bounds.check(position)?;
        Ok(())
    }

    /// Credits the agent for visiting `resource`.
    ///
    /// Returns `false` without changing anything if the resource was already
    /// recorded.
    pub fn record_visit(&mut self, resource: &Resource) -> bool {
        if !self.visited_set.insert(resource.id.clone()) {
            return false;
        }
        self.visited.push(resource.id.clone());
        self.total_reward = self.total_reward.saturating_add(resource.reward);
        self.level = level_for(self.total_reward);
        debug!(
            resource = %resource.id,
            reward = resource.reward,
            total_reward = self.total_reward,
            level = self.level,
            "recorded visit"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceCategory;

    fn agent() -> LearnerAgent {
        LearnerAgent::new(GridPosition::new(0, 9), GridBounds::new(10, 10)).unwrap()
    }

    fn res(id: &str, reward: u32) -> Resource {
        Resource::new(
            id,
            GridPosition::new(1, 1),
            ResourceCategory::Assignment,
            id,
            3,
            reward,
        )
    }

    #[test]
    fn starts_at_level_one() {
        let agent = agent();
        assert_eq!(agent.level(), 1);
        assert_eq!(agent.total_reward(), 0);
        assert!(agent.visited().is_empty());
    }

    #[test]
    fn large_reward_jumps_levels() {
        let mut agent = agent();
        assert!(agent.record_visit(&res("big", 250)));
        assert_eq!(agent.total_reward(), 250);
        assert_eq!(agent.level(), 3);
        assert_eq!(agent.position(), GridPosition::new(0, 9));
    }

    #[test]
    fn repeat_visits_are_ignored() {
        let mut agent = agent();
        let r = res("a", 60);
        assert!(agent.record_visit(&r));
        assert!(!agent.record_visit(&r));
        assert_eq!(agent.total_reward(), 60);
        assert_eq!(agent.visited(), &[ResourceId::from("a")]);
    }

    #[test]
    fn level_tracks_reward_after_every_visit() {
        let mut agent = agent();
        for (i, reward) in [50, 60, 70, 80, 90, 85, 100, 5, 1].into_iter().enumerate() {
            agent.record_visit(&res(&i.to_string(), reward));
            assert_eq!(agent.level(), agent.total_reward() / 100 + 1);
        }
        assert_eq!(agent.total_reward(), 541);
        assert_eq!(agent.level(), 6);
    }

    #[test]
    fn visit_order_is_preserved() {
        let mut agent = agent();
        for id in ["c", "a", "b", "a"] {
            agent.record_visit(&res(id, 10));
        }
        let ids: Vec<&str> = agent.visited().iter().map(ResourceId::as_str).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn off_grid_moves_are_rejected() {
        let mut agent = agent();
        assert!(agent.move_to(GridPosition::new(10, 0)).is_err());
        assert_eq!(agent.position(), GridPosition::new(0, 9));
        agent.move_to(GridPosition::new(9, 0)).unwrap();
        assert_eq!(agent.position(), GridPosition::new(9, 0));
        assert_eq!(agent.total_reward(), 0);
    }

    #[test]
    fn start_must_be_on_grid() {
        assert!(LearnerAgent::new(GridPosition::new(0, 10), GridBounds::new(10, 10)).is_err());
    }
}
