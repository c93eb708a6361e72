use std::collections::HashSet;

use serde::Serialize;

use crate::{
    GridPosition, Resource, ResourceCategory, ResourceId,
    grid::{Grid, GridBounds, GridError},
};

/// Problems found while building or parsing a resource catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog is empty")]
    Empty,
    #[error("Line {line}: expected at least 7 fields, found {found}")]
    MissingFields { line: usize, found: usize },
    #[error("Line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("Unknown category '{category}' at line {line}")]
    UnknownCategory { line: usize, category: String },
    #[error("Resource id '{0}' appears more than once")]
    DuplicateId(ResourceId),
    #[error("Resources '{first}' and '{second}' share cell {position}")]
    SharedCell {
        first: ResourceId,
        second: ResourceId,
        position: GridPosition,
    },
    #[error("Resource '{id}' has difficulty {difficulty}, expected 1 to 5")]
    DifficultyOutOfRange { id: ResourceId, difficulty: u8 },
    #[error("Resource '{0}' must have a positive reward")]
    ZeroReward(ResourceId),
    #[error("Resource '{id}' is placed off the grid: {source}")]
    OffGrid {
        id: ResourceId,
        #[source]
        source: GridError,
    },
}

/// The static set of resources placed on the grid for one session.
///
/// Catalog order is significant: it is the tie-break order for target
/// selection. Only the `visited` flag of a resource ever changes.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    resources: Vec<Resource>,
    #[serde(skip)]
    cells: Grid<Option<usize>>,
}

impl Catalog {
    /// Validates `resources` against `bounds` and indexes them by cell.
    pub fn new(resources: Vec<Resource>, bounds: GridBounds) -> Result<Self, CatalogError> {
        if resources.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut cells: Grid<Option<usize>> = Grid::new(bounds);
        let mut ids = HashSet::with_capacity(resources.len());

        for (index, resource) in resources.iter().enumerate() {
            if !ids.insert(resource.id.clone()) {
                return Err(CatalogError::DuplicateId(resource.id.clone()));
            }
            if !(1..=5).contains(&resource.difficulty) {
                return Err(CatalogError::DifficultyOutOfRange {
                    id: resource.id.clone(),
                    difficulty: resource.difficulty,
                });
            }
            if resource.reward == 0 {
                return Err(CatalogError::ZeroReward(resource.id.clone()));
            }
            bounds
                .check(resource.position)
                .map_err(|source| CatalogError::OffGrid {
                    id: resource.id.clone(),
                    source,
                })?;
            if let Some(existing) = cells[resource.position] {
                return Err(CatalogError::SharedCell {
                    first: resources[existing].id.clone(),
                    second: resource.id.clone(),
                    position: resource.position,
                });
            }
            cells[resource.position] = Some(index);
        }

        Ok(Self { resources, cells })
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.resources.iter().find(|r| &r.id == id)
    }

    /// Returns the resource placed on `position`, if any.
    pub fn at(&self, position: GridPosition) -> Option<&Resource> {
        self.cells
            .get(position)
            .copied()
            .flatten()
            .map(|index| &self.resources[index])
    }

    /// Flips the resource's `visited` flag.
    ///
    /// Returns `Some(true)` on the first visit, `Some(false)` if it was
    /// already visited and `None` for an unknown id.
    pub fn mark_visited(&mut self, id: &ResourceId) -> Option<bool> {
        let resource = self.resources.iter_mut().find(|r| &r.id == id)?;
        let first = !resource.visited;
        resource.visited = true;
        Some(first)
    }

    /// Resources in the order the given ids were visited. Unknown ids are skipped.
    pub fn in_visit_order<'a>(&'a self, visited: &'a [ResourceId]) -> Vec<&'a Resource> {
        visited.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Resources with the `visited` flag set, in catalog order.
    pub fn visited(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(|r| r.visited)
    }
}

/// Parses a catalog from its text form.
///
/// One resource per line:
///
/// ```text
/// <id> <x> <y> <category> <difficulty> <reward> <title words...> [| subtopic, subtopic]
/// ```
///
/// Blank lines and lines starting with `#` are ignored. The result is not
/// validated against any grid; pass it to [`Catalog::new`] for that.
pub fn parse_catalog(text: &str) -> Result<Vec<Resource>, CatalogError> {
    let mut resources = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (body, subtopics) = match trimmed.split_once('|') {
            Some((body, rest)) => (
                body,
                rest.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            None => (trimmed, Vec::new()),
        };

        let tokens: Vec<&str> = body.split_whitespace().collect();
        if tokens.len() < 7 {
            return Err(CatalogError::MissingFields {
                line,
                found: tokens.len(),
            });
        }

        let x = parse_number::<usize>(line, "x", tokens[1])?;
        let y = parse_number::<usize>(line, "y", tokens[2])?;
        let category =
            ResourceCategory::parse(tokens[3]).ok_or_else(|| CatalogError::UnknownCategory {
                line,
                category: tokens[3].to_string(),
            })?;
        let difficulty = parse_number::<u8>(line, "difficulty", tokens[4])?;
        let reward = parse_number::<u32>(line, "reward", tokens[5])?;
        let title = tokens[6..].join(" ");

        resources.push(
            Resource::new(
                tokens[0],
                GridPosition { x, y },
                category,
                title,
                difficulty,
                reward,
            )
            .with_subtopics(subtopics),
        );
    }

    if resources.is_empty() {
        return Err(CatalogError::Empty);
    }
    Ok(resources)
}

fn parse_number<T: std::str::FromStr>(
    line: usize,
    field: &'static str,
    token: &str,
) -> Result<T, CatalogError> {
    token.parse().map_err(|_| CatalogError::InvalidField {
        line,
        field,
        value: token.to_string(),
    })
}

/// The built-in discrete mathematics catalog, laid out on a 10x10 grid.
pub fn default_catalog() -> Vec<Resource> {
    use ResourceCategory::Book;

    [
        ("1", 1, 8, "Propositional Logic", 1, 50),
        ("2", 3, 7, "Predicate Logic", 2, 60),
        ("3", 2, 6, "Proof Strategies", 2, 70),
        ("4", 4, 5, "Sets and Relations", 3, 80),
        ("5", 6, 4, "Equivalence Relations", 3, 90),
        ("6", 5, 3, "Partitions", 3, 85),
        ("7", 7, 2, "Partial Orderings", 4, 100),
        ("8", 8, 1, "Theory of Countability", 4, 110),
        ("9", 6, 7, "Combinatorics", 4, 120),
        ("10", 8, 6, "Graph Theory", 5, 130),
        ("11", 7, 8, "Number Theory", 5, 140),
        ("12", 9, 9, "Abstract Algebra", 5, 150),
    ]
    .into_iter()
    .map(|(id, x, y, title, difficulty, reward)| {
        Resource::new(id, GridPosition { x, y }, Book, title, difficulty, reward)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
        # id x y category difficulty reward title
        a 3 9 book 1 50 Intro to Sets | unions, intersections
        b 1 9 video 2 10 Logic Primer

        q 0 0 quiz 3 30 Weekly Quiz
    ";

    #[test]
    fn parses_titles_and_subtopics() {
        let resources = parse_catalog(SAMPLE).unwrap();
        assert_eq!(resources.len(), 3);
        assert_eq!(resources[0].title, "Intro to Sets");
        assert_eq!(resources[0].subtopics, vec!["unions", "intersections"]);
        assert_eq!(resources[1].category, ResourceCategory::Video);
        assert!(resources[2].subtopics.is_empty());
        assert!(resources.iter().all(|r| !r.visited));
    }

    #[test]
    fn reports_the_failing_line() {
        let err = parse_catalog("a 1 1 book 1 10 Fine\nb 2 x book 1 10 Broken").unwrap_err();
        assert_eq!(
            err,
            CatalogError::InvalidField {
                line: 2,
                field: "y",
                value: "x".to_string()
            }
        );
        let err = parse_catalog("a 1 1 podcast 1 10 Audio").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownCategory { line: 1, .. }));
        let err = parse_catalog("a 1 1 book").unwrap_err();
        assert_eq!(err, CatalogError::MissingFields { line: 1, found: 4 });
    }

    #[test]
    fn rejects_invalid_catalogs() {
        let bounds = GridBounds::new(10, 10);
        let pos = GridPosition::new(1, 1);
        let book = ResourceCategory::Book;

        let dup = vec![
            Resource::new("a", pos, book, "A", 1, 10),
            Resource::new("a", GridPosition::new(2, 2), book, "A again", 1, 10),
        ];
        assert!(matches!(
            Catalog::new(dup, bounds),
            Err(CatalogError::DuplicateId(_))
        ));

        let shared = vec![
            Resource::new("a", pos, book, "A", 1, 10),
            Resource::new("b", pos, book, "B", 1, 10),
        ];
        assert!(matches!(
            Catalog::new(shared, bounds),
            Err(CatalogError::SharedCell { .. })
        ));

        let off = vec![Resource::new("a", GridPosition::new(10, 0), book, "A", 1, 10)];
        assert!(matches!(
            Catalog::new(off, bounds),
            Err(CatalogError::OffGrid { .. })
        ));

        let hard = vec![Resource::new("a", pos, book, "A", 6, 10)];
        assert!(matches!(
            Catalog::new(hard, bounds),
            Err(CatalogError::DifficultyOutOfRange { difficulty: 6, .. })
        ));

        let free = vec![Resource::new("a", pos, book, "A", 1, 0)];
        assert!(matches!(
            Catalog::new(free, bounds),
            Err(CatalogError::ZeroReward(_))
        ));
    }

    #[test]
    fn mark_visited_flips_once() {
        let mut catalog = Catalog::new(default_catalog(), GridBounds::new(10, 10)).unwrap();
        let id = ResourceId::from("3");
        assert_eq!(catalog.mark_visited(&id), Some(true));
        assert_eq!(catalog.mark_visited(&id), Some(false));
        assert_eq!(catalog.mark_visited(&ResourceId::from("nope")), None);
        assert_eq!(catalog.visited().count(), 1);
    }

    #[test]
    fn looks_up_resources_by_cell() {
        let catalog = Catalog::new(default_catalog(), GridBounds::new(10, 10)).unwrap();
        assert_eq!(
            catalog.at(GridPosition::new(9, 9)).map(|r| r.title.as_str()),
            Some("Abstract Algebra")
        );
        assert!(catalog.at(GridPosition::new(0, 0)).is_none());
        assert!(catalog.at(GridPosition::new(50, 50)).is_none());
    }
}
