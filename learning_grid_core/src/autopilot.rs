use std::collections::VecDeque;

use tracing::debug;

use crate::{EngineError, GridPosition, ResourceId, session::Session};

/// What happened on one autopilot tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutopilotStep {
    /// The agent moved onto an empty or already visited cell.
    Moved(GridPosition),
    /// The agent moved onto an unvisited resource and visited it.
    Visited {
        id: ResourceId,
        position: GridPosition,
    },
    /// Every resource has been visited; nothing left to do.
    Exhausted,
}

/// Drives the agent along the simulation path while the simulation runs.
///
/// Keeps a queue of cells to walk. When the queue drains it plans a fresh
/// tour from wherever the agent stands.
#[derive(Debug, Default)]
pub struct Autopilot {
    plan: VecDeque<GridPosition>,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells still queued.
    pub fn remaining(&self) -> usize {
        self.plan.len()
    }

    /// Drops the queued plan, e.g. when the simulation is switched off.
    pub fn clear(&mut self) {
        self.plan.clear();
    }

    /// Plans a tour from the agent's cell and shows it as the simulation path.
    pub fn engage(&mut self, session: &mut Session) -> Result<(), EngineError> {
        let path = session.start_simulation()?;
        self.plan = path.into_iter().skip(1).collect();
        debug!(steps = self.plan.len(), "autopilot plan loaded");
        Ok(())
    }

    /// Advances the agent one cell.
    pub fn tick(&mut self, session: &mut Session) -> Result<AutopilotStep, EngineError> {
        let current = session.agent().position();

        // No planned leg ends on the agent's own cell, so take that one first.
        if let Some(id) = Self::unvisited_at(session, current) {
            session.click_resource(&id)?;
            return Ok(AutopilotStep::Visited {
                id,
                position: current,
            });
        }

        // The agent may have been moved by hand since the plan was made.
        if let Some(next) = self.plan.front() {
            if next.manhattan_distance(&current) != 1 {
                debug!(%current, %next, "agent left the planned path; replanning");
                self.plan.clear();
            }
        }

        if self.plan.is_empty() {
            if session.recommended_target().is_none() {
                return Ok(AutopilotStep::Exhausted);
            }
            self.engage(session)?;
        }

        let Some(next) = self.plan.pop_front() else {
            return Ok(AutopilotStep::Exhausted);
        };
        session.move_agent(next)?;

        match Self::unvisited_at(session, next) {
            Some(id) => {
                session.click_resource(&id)?;
                Ok(AutopilotStep::Visited { id, position: next })
            }
            None => Ok(AutopilotStep::Moved(next)),
        }
    }

    fn unvisited_at(session: &Session, position: GridPosition) -> Option<ResourceId> {
        session
            .resource_at(position)
            .filter(|r| !r.visited)
            .map(|r| r.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Resource, ResourceCategory, config::EngineConfig};

    fn p(x: usize, y: usize) -> GridPosition {
        GridPosition::new(x, y)
    }

    fn session() -> Session {
        let config = EngineConfig {
            width: 5,
            height: 5,
            start: p(0, 0),
            seed: Some(1),
            ..EngineConfig::default()
        };
        let resources = vec![
            Resource::new("near", p(2, 0), ResourceCategory::Video, "Near", 1, 20),
            Resource::new("far", p(2, 2), ResourceCategory::Quiz, "Far", 1, 40),
        ];
        Session::new(config, resources).unwrap()
    }

    #[test]
    fn walks_the_tour_and_visits_resources() {
        let mut session = session();
        let mut autopilot = Autopilot::new();
        let mut steps = Vec::new();
        loop {
            match autopilot.tick(&mut session).unwrap() {
                AutopilotStep::Exhausted => break,
                step => steps.push(step),
            }
            assert!(steps.len() <= 20, "autopilot did not terminate");
        }

        // far first (higher reward): (0,0) -> (2,2), then back up to (2,0)
        assert_eq!(
            steps,
            vec![
                AutopilotStep::Moved(p(1, 0)),
                AutopilotStep::Moved(p(1, 1)),
                AutopilotStep::Moved(p(2, 1)),
                AutopilotStep::Visited {
                    id: "far".into(),
                    position: p(2, 2)
                },
                AutopilotStep::Moved(p(2, 1)),
                AutopilotStep::Visited {
                    id: "near".into(),
                    position: p(2, 0)
                },
            ]
        );
        assert_eq!(session.agent().total_reward(), 60);
        assert_eq!(session.summary().visited_resources, 2);
    }

    #[test]
    fn replans_after_a_manual_move() {
        let mut session = session();
        let mut autopilot = Autopilot::new();
        autopilot.engage(&mut session).unwrap();
        assert_eq!(autopilot.remaining(), 6);

        session.move_agent(p(4, 4)).unwrap();
        let step = autopilot.tick(&mut session).unwrap();
        // fresh tour from (4,4) towards "far" at (2,2)
        assert_eq!(step, AutopilotStep::Moved(p(3, 4)));
    }

    #[test]
    fn visits_a_resource_under_the_agent_first() {
        let config = EngineConfig {
            width: 5,
            height: 5,
            start: p(0, 0),
            seed: Some(1),
            ..EngineConfig::default()
        };
        let resources = vec![Resource::new(
            "here",
            p(0, 0),
            ResourceCategory::Book,
            "Here",
            1,
            30,
        )];
        let mut session = Session::new(config, resources).unwrap();
        let mut autopilot = Autopilot::new();

        assert_eq!(
            autopilot.tick(&mut session).unwrap(),
            AutopilotStep::Visited {
                id: "here".into(),
                position: p(0, 0)
            }
        );
        assert_eq!(session.agent().total_reward(), 30);
        assert_eq!(autopilot.tick(&mut session).unwrap(), AutopilotStep::Exhausted);
    }

    #[test]
    fn manual_move_onto_a_resource_is_picked_up() {
        let mut session = session();
        let mut autopilot = Autopilot::new();
        autopilot.engage(&mut session).unwrap();

        session.move_agent(p(2, 0)).unwrap();
        assert_eq!(
            autopilot.tick(&mut session).unwrap(),
            AutopilotStep::Visited {
                id: "near".into(),
                position: p(2, 0)
            }
        );
        // "far" is still ahead
        assert_ne!(autopilot.tick(&mut session).unwrap(), AutopilotStep::Exhausted);
    }

    #[test]
    fn idle_when_nothing_is_left() {
        let mut session = session();
        session.visit_resource(&"near".into()).unwrap();
        session.visit_resource(&"far".into()).unwrap();
        let mut autopilot = Autopilot::new();
        assert_eq!(autopilot.tick(&mut session).unwrap(), AutopilotStep::Exhausted);
        assert_eq!(session.agent().position(), p(0, 0));
    }
}
