//! Route records handed to the front end for drawing.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{GridPosition, Resource};

pub const CURRENT_PATH_ID: &str = "learning-path-1";
pub const CURRENT_PATH_CONFIDENCE: f64 = 0.85;
pub const SIMULATION_PATH_ID: &str = "simulation-path";
pub const SIMULATION_PATH_CONFIDENCE: f64 = 0.95;

/// Confidence range drawn for summary routes. Purely cosmetic.
pub const SUMMARY_CONFIDENCE_MIN: f64 = 0.75;
pub const SUMMARY_CONFIDENCE_MAX: f64 = 0.95;

/// An RGBA colour. The engine never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

pub const CURRENT_PATH_COLOR: Rgba = Rgba::new(59, 130, 246, 0.4);
pub const SIMULATION_PATH_COLOR: Rgba = Rgba::new(239, 68, 68, 0.5);
const SUMMARY_ALPHA: f32 = 0.4;

/// A named route across the grid.
///
/// The path holds copies of positions, so later changes to resources never
/// alter a route that was already built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub id: String,
    pub name: String,
    pub path: Vec<GridPosition>,
    pub color: Rgba,
    pub is_active: bool,
    pub confidence: f64,
    pub annotation: Option<String>,
}

impl Polyline {
    pub fn contains(&self, position: GridPosition) -> bool {
        self.path.contains(&position)
    }
}

/// The route through visited resources, in visit order.
///
/// A route needs two points, so fewer than two visits produce nothing.
pub fn build_current_path_polyline(visited_in_order: &[&Resource]) -> Option<Polyline> {
    if visited_in_order.len() < 2 {
        return None;
    }
    Some(Polyline {
        id: CURRENT_PATH_ID.to_string(),
        name: "Current Learning Path".to_string(),
        path: visited_in_order.iter().map(|r| r.position).collect(),
        color: CURRENT_PATH_COLOR,
        is_active: true,
        confidence: CURRENT_PATH_CONFIDENCE,
        annotation: None,
    })
}

/// A route snapshot attached to a learning summary.
///
/// Always returns exactly one polyline, with an empty path if nothing was
/// visited. Colour and confidence are drawn from `rng`.
pub fn build_summary_polyline<R: Rng>(
    id: String,
    visited: &[&Resource],
    title: Option<&str>,
    annotation: Option<String>,
    rng: &mut R,
) -> Polyline {
    let color = Rgba::new(
        rng.random_range(0..=255),
        rng.random_range(0..=255),
        rng.random_range(0..=255),
        SUMMARY_ALPHA,
    );
    Polyline {
        name: title.map_or_else(|| format!("Learning Summary ({id})"), str::to_string),
        id,
        path: visited.iter().map(|r| r.position).collect(),
        color,
        is_active: false,
        confidence: rng.random_range(SUMMARY_CONFIDENCE_MIN..=SUMMARY_CONFIDENCE_MAX),
        annotation,
    }
}

/// The planned route shown while the simulation runs.
pub fn build_simulation_polyline(path: Vec<GridPosition>) -> Polyline {
    Polyline {
        id: SIMULATION_PATH_ID.to_string(),
        name: "Simulation Path".to_string(),
        path,
        color: SIMULATION_PATH_COLOR,
        is_active: true,
        confidence: SIMULATION_PATH_CONFIDENCE,
        annotation: None,
    }
}

/// The polylines of a session, in creation order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteSet {
    routes: Vec<Polyline>,
}

impl RouteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Polyline> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Polyline> {
        self.routes.iter().find(|p| p.id == id)
    }

    pub fn push(&mut self, polyline: Polyline) {
        self.routes.push(polyline);
    }

    /// Replaces the route with the same id, or appends it at the end.
    pub fn upsert(&mut self, polyline: Polyline) {
        self.routes.retain(|p| p.id != polyline.id);
        self.routes.push(polyline);
    }

    /// Makes `id` the only active route. Returns `false` if it does not exist,
    /// in which case nothing changes.
    pub fn show(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        for route in &mut self.routes {
            route.is_active = route.id == id;
        }
        true
    }

    pub fn active(&self) -> impl Iterator<Item = &Polyline> {
        self.routes.iter().filter(|p| p.is_active)
    }

    /// The first active route passing through `position`.
    pub fn active_at(&self, position: GridPosition) -> Option<&Polyline> {
        self.active().find(|p| p.contains(position))
    }

    /// Whether any active route passes through `position`.
    pub fn covers(&self, position: GridPosition) -> bool {
        self.active_at(position).is_some()
    }
}
