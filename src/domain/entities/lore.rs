//! Lore entity - the structured narrative premise feeding the pipeline

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Inclusive min/max pair used for branching and depth constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
}

impl Bounds {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Check `min <= max`, naming the owning field on failure
    pub fn validate(&self, field: &'static str) -> Result<(), DomainError> {
        if self.min > self.max {
            return Err(DomainError::InvalidBounds {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// The quest premise: everything the generative model needs to compile a
/// planning domain and, later, narrate the story.
///
/// Immutable once loaded; one instance lives for exactly one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lore {
    pub title: String,
    pub description: String,
    /// Prose description of the starting situation
    pub initial_state: String,
    pub goal: String,
    pub world_context: String,
    #[serde(default)]
    pub obstacles: Vec<String>,
    /// Choices offered per story state
    #[serde(default = "Lore::default_branching")]
    pub branching_factor: Bounds,
    /// Steps from start to goal
    #[serde(default = "Lore::default_depth")]
    pub depth_constraints: Bounds,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub items: Vec<String>,
}

impl Lore {
    fn default_branching() -> Bounds {
        Bounds::new(1, 3)
    }

    fn default_depth() -> Bounds {
        Bounds::new(3, 10)
    }

    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        initial_state: impl Into<String>,
        goal: impl Into<String>,
        world_context: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            initial_state: initial_state.into(),
            goal: goal.into(),
            world_context: world_context.into(),
            obstacles: Vec::new(),
            branching_factor: Self::default_branching(),
            depth_constraints: Self::default_depth(),
            characters: Vec::new(),
            locations: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_obstacles(mut self, obstacles: Vec<String>) -> Self {
        self.obstacles = obstacles;
        self
    }

    pub fn with_characters(mut self, characters: Vec<String>) -> Self {
        self.characters = characters;
        self
    }

    pub fn with_locations(mut self, locations: Vec<String>) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_items(mut self, items: Vec<String>) -> Self {
        self.items = items;
        self
    }

    pub fn with_branching_factor(mut self, min: u32, max: u32) -> Result<Self, DomainError> {
        let bounds = Bounds::new(min, max);
        bounds.validate("branching_factor")?;
        self.branching_factor = bounds;
        Ok(self)
    }

    pub fn with_depth_constraints(mut self, min: u32, max: u32) -> Result<Self, DomainError> {
        let bounds = Bounds::new(min, max);
        bounds.validate("depth_constraints")?;
        self.depth_constraints = bounds;
        Ok(self)
    }

    /// Check the bound invariants of an instance assembled elsewhere
    /// (deserialized documents go through this before use)
    pub fn validate(&self) -> Result<(), DomainError> {
        self.branching_factor.validate("branching_factor")?;
        self.depth_constraints.validate("depth_constraints")?;
        Ok(())
    }

    /// Build a Lore from a legacy document: either a JSON object with any
    /// subset of the fields, or free text that becomes the description.
    ///
    /// Missing fields get conservative defaults; non-object JSON is treated
    /// the same as free text.
    pub fn from_legacy_json(input: &str) -> Result<Self, DomainError> {
        match serde_json::from_str::<serde_json::Value>(input) {
            Ok(serde_json::Value::Object(map)) => Self::from_legacy_map(&map),
            _ => Ok(Self::new(
                "Legacy Quest",
                input,
                "Starting state",
                "Complete the quest",
                "Fantasy world",
            )),
        }
    }

    fn from_legacy_map(
        map: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, DomainError> {
        let get_str = |key: &str, default: &str| -> String {
            map.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or(default)
                .to_string()
        };
        let get_list = |key: &str| -> Vec<String> {
            map.get(key)
                .and_then(|v| v.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        };
        let get_bounds = |key: &str, default: Bounds| -> Bounds {
            map.get(key)
                .and_then(|v| v.as_object())
                .map(|b| {
                    let field = |name: &str, fallback: u32| {
                        b.get(name).and_then(|v| v.as_u64()).map(|n| n as u32).unwrap_or(fallback)
                    };
                    Bounds::new(field("min", default.min), field("max", default.max))
                })
                .unwrap_or(default)
        };

        let lore = Self {
            title: get_str("title", "Legacy Quest"),
            description: get_str("description", ""),
            initial_state: get_str("initial_state", "Starting state"),
            goal: get_str("goal", "Complete the quest"),
            world_context: get_str("world_context", "Fantasy world"),
            obstacles: get_list("obstacles"),
            branching_factor: get_bounds("branching_factor", Self::default_branching()),
            depth_constraints: get_bounds("depth_constraints", Self::default_depth()),
            characters: get_list("characters"),
            locations: get_list("locations"),
            items: get_list("items"),
        };
        lore.validate()?;
        Ok(lore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_rejects_inverted_range() {
        let err = Bounds::new(5, 2).validate("branching_factor").unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidBounds {
                field: "branching_factor",
                min: 5,
                max: 2,
            }
        );
    }

    #[test]
    fn test_with_branching_factor_validates() {
        let lore = Lore::new("Quest", "desc", "init", "goal", "world");
        assert!(lore.clone().with_branching_factor(2, 4).is_ok());
        assert!(lore.with_branching_factor(4, 2).is_err());
    }

    #[test]
    fn test_builders_fill_optional_fields() {
        let lore = Lore::new("Quest", "desc", "init", "goal", "world")
            .with_obstacles(vec!["flooded tunnel".into()])
            .with_locations(vec!["the vault".into()])
            .with_items(vec!["tide-pearl".into()]);

        assert_eq!(lore.obstacles, vec!["flooded tunnel"]);
        assert_eq!(lore.locations, vec!["the vault"]);
        assert_eq!(lore.items, vec!["tide-pearl"]);
    }

    #[test]
    fn test_from_legacy_json_object() {
        let input = r#"{
            "title": "The Sunken Vault",
            "goal": "Recover the tide-pearl",
            "characters": ["Mara", "The Warden"],
            "branching_factor": {"min": 2, "max": 4}
        }"#;

        let lore = Lore::from_legacy_json(input).unwrap();
        assert_eq!(lore.title, "The Sunken Vault");
        assert_eq!(lore.goal, "Recover the tide-pearl");
        assert_eq!(lore.characters, vec!["Mara", "The Warden"]);
        assert_eq!(lore.branching_factor, Bounds::new(2, 4));
        // Untouched fields fall back to defaults
        assert_eq!(lore.world_context, "Fantasy world");
        assert_eq!(lore.depth_constraints, Bounds::new(3, 10));
    }

    #[test]
    fn test_from_legacy_json_plain_text_becomes_description() {
        let lore = Lore::from_legacy_json("A knight seeks a lost crown.").unwrap();
        assert_eq!(lore.title, "Legacy Quest");
        assert_eq!(lore.description, "A knight seeks a lost crown.");
        assert_eq!(lore.goal, "Complete the quest");
    }

    #[test]
    fn test_from_legacy_json_rejects_inverted_bounds() {
        let input = r#"{"title": "Bad", "branching_factor": {"min": 9, "max": 1}}"#;
        assert!(Lore::from_legacy_json(input).is_err());
    }

    #[test]
    fn test_from_legacy_json_non_object_json_is_text() {
        let lore = Lore::from_legacy_json("[1, 2, 3]").unwrap();
        assert_eq!(lore.description, "[1, 2, 3]");
    }
}
