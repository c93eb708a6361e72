//! Greedy staircase paths between grid cells.
//!
//! Every path moves one cell per step along a single axis, so its length is
//! always the manhattan distance plus one. There is no obstacle handling and
//! no backtracking: the grid is open and the planner commits to each step.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    GridPosition, Resource, ResourceId,
    grid::{GridBounds, GridError},
};

/// Maximum number of resources chained into one tour.
pub const TOUR_LENGTH: usize = 3;

/// Which axis the planner closes first when both deltas are non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPolicy {
    /// Step along the axis with the larger remaining delta; ties go to x.
    #[default]
    DominantAxis,
    /// Always close +x, then +y, then -x, then -y.
    FixedPriority,
}

impl StepPolicy {
    /// Returns the cell one step from `current` towards `target`, or `None`
    /// if they are equal.
    pub fn step(&self, current: GridPosition, target: GridPosition) -> Option<GridPosition> {
        let dx = target.x as isize - current.x as isize;
        let dy = target.y as isize - current.y as isize;
        if dx == 0 && dy == 0 {
            return None;
        }

        let (sx, sy) = match self {
            StepPolicy::DominantAxis => {
                if dx.abs() >= dy.abs() {
                    (dx.signum(), 0)
                } else {
                    (0, dy.signum())
                }
            }
            StepPolicy::FixedPriority => {
                if dx > 0 {
                    (1, 0)
                } else if dy > 0 {
                    (0, 1)
                } else if dx < 0 {
                    (-1, 0)
                } else {
                    (0, -1)
                }
            }
        };

        // The step moves towards a valid target, so it never underflows.
        Some(GridPosition {
            x: current.x.checked_add_signed(sx)?,
            y: current.y.checked_add_signed(sy)?,
        })
    }
}

/// Plans a path from `start` to `target`, both endpoints included.
///
/// Both cells must be on the grid; off-grid input is rejected rather than
/// clamped.
pub fn plan_path(
    start: GridPosition,
    target: GridPosition,
    policy: StepPolicy,
    bounds: &GridBounds,
) -> Result<Vec<GridPosition>, GridError> {
    bounds.check(start)?;
    bounds.check(target)?;

    let distance = start.manhattan_distance(&target);
    let mut path = Vec::with_capacity(distance + 1);
    path.push(start);

    let mut current = start;
    for _ in 0..distance {
        match policy.step(current, target) {
            Some(next) => {
                path.push(next);
                current = next;
            }
            None => break,
        }
    }

    debug_assert_eq!(current, target);
    Ok(path)
}

/// Plans towards an optional target; no target means staying on `start`.
pub fn plan_to(
    start: GridPosition,
    target: Option<&Resource>,
    policy: StepPolicy,
    bounds: &GridBounds,
) -> Result<Vec<GridPosition>, GridError> {
    match target {
        Some(resource) => plan_path(start, resource.position, policy, bounds),
        None => {
            bounds.check(start)?;
            Ok(vec![start])
        }
    }
}

/// The cell the agent should move to next, or `start` if there is no target.
pub fn next_step(start: GridPosition, target: Option<&Resource>, policy: StepPolicy) -> GridPosition {
    target
        .and_then(|resource| policy.step(start, resource.position))
        .unwrap_or(start)
}

/// Orders unvisited resources for a tour: reward descending, then
/// `x + y` descending (towards the high corner), then catalog order.
pub fn rank_targets<'a>(
    resources: &'a [Resource],
    visited: &HashSet<ResourceId>,
    limit: usize,
) -> Vec<&'a Resource> {
    let mut ranked: Vec<&Resource> = resources
        .iter()
        .filter(|r| !r.visited && !visited.contains(&r.id))
        .collect();
    // sort_by is stable, so catalog order survives full ties
    ranked.sort_by(|a, b| {
        b.reward
            .cmp(&a.reward)
            .then_with(|| (b.position.x + b.position.y).cmp(&(a.position.x + a.position.y)))
    });
    ranked.truncate(limit);
    ranked
}

/// Chains single-target paths through the top [`TOUR_LENGTH`] ranked
/// resources, each leg starting where the previous one ended.
///
/// The visiting order is the ranking order, not the shortest tour.
pub fn plan_tour(
    start: GridPosition,
    resources: &[Resource],
    visited: &HashSet<ResourceId>,
    policy: StepPolicy,
    bounds: &GridBounds,
) -> Result<Vec<GridPosition>, GridError> {
    bounds.check(start)?;

    let targets = rank_targets(resources, visited, TOUR_LENGTH);
    let mut path = vec![start];
    let mut current = start;

    for target in &targets {
        let leg = plan_path(current, target.position, policy, bounds)?;
        path.extend(leg.into_iter().skip(1));
        current = target.position;
    }

    debug!(
        targets = targets.len(),
        steps = path.len() - 1,
        ?policy,
        "planned tour"
    );
    Ok(path)
}
