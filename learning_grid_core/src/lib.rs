use std::fmt;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod autopilot;
pub mod catalog;
pub mod config;
pub mod error;
pub mod grid;
pub mod planner;
pub mod polyline;
pub mod scoring;
pub mod session;
pub mod summary;

pub use error::EngineError;

/// Represents a cell coordinate on the learning grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: usize,
    pub y: usize,
}

impl GridPosition {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Returns the manhattan distance to `other`.
    pub fn manhattan_distance(&self, other: &GridPosition) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unique identifier of a resource in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The kind of learning material a resource represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Book,
    Video,
    Quiz,
    Assignment,
}

impl ResourceCategory {
    /// Parses the lowercase catalog spelling of a category.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "book" => Some(ResourceCategory::Book),
            "video" => Some(ResourceCategory::Video),
            "quiz" => Some(ResourceCategory::Quiz),
            "assignment" => Some(ResourceCategory::Assignment),
            _ => None,
        }
    }
}

/// A visitable point of interest on the grid.
///
/// Everything except `visited` is fixed when the catalog is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub position: GridPosition,
    pub category: ResourceCategory,
    pub title: String,
    /// 1 (introductory) to 5 (advanced).
    pub difficulty: u8,
    pub reward: u32,
    pub visited: bool,
    #[serde(default)]
    pub subtopics: Vec<String>,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        position: GridPosition,
        category: ResourceCategory,
        title: impl Into<String>,
        difficulty: u8,
        reward: u32,
    ) -> Self {
        Self {
            id: ResourceId::new(id),
            position,
            category,
            title: title.into(),
            difficulty,
            reward,
            visited: false,
            subtopics: Vec::new(),
        }
    }

    pub fn with_subtopics<I, S>(mut self, subtopics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtopics = subtopics.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = GridPosition::new(0, 9);
        let b = GridPosition::new(3, 7);
        assert_eq!(a.manhattan_distance(&b), 5);
        assert_eq!(b.manhattan_distance(&a), 5);
        assert_eq!(a.manhattan_distance(&a), 0);
    }

    #[test]
    fn category_parses_lowercase_names() {
        assert_eq!(ResourceCategory::parse("quiz"), Some(ResourceCategory::Quiz));
        assert_eq!(
            ResourceCategory::parse("assignment"),
            Some(ResourceCategory::Assignment)
        );
        assert_eq!(ResourceCategory::parse("Book"), None);
    }
}
