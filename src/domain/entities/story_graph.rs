//! Story graph entity - the branching narrative as a finite state machine
//!
//! A graph owns all of its states and choices outright; it is built once
//! per successful pipeline run and replaced wholesale on regeneration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A choice the player can make from a state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionChoice {
    /// Unique within the owning state
    pub id: String,
    /// Display text
    pub text: String,
    /// Id of the state this choice leads to
    pub target_state: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A single narrative beat with the choices leading out of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryState {
    #[serde(default)]
    pub id: String,
    /// Main narrative text
    pub text: String,
    #[serde(default)]
    pub actions: Vec<ActionChoice>,
    /// Derived at graph construction: true iff `actions` is empty
    #[serde(default)]
    pub is_terminal: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Complete story representation as a state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryGraph {
    pub title: String,
    pub description: String,
    /// Id of the entry state; always a key of `states`
    pub initial_state: String,
    pub states: BTreeMap<String, StoryState>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StoryGraph {
    /// Assemble and validate a graph.
    ///
    /// State ids are the map keys; each state's embedded `id` field is
    /// normalized to its key and `is_terminal` is recomputed from the
    /// action list. Fails when the initial state is missing, an action
    /// targets a state that does not exist, or two actions in one state
    /// share an id.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        initial_state: impl Into<String>,
        mut states: BTreeMap<String, StoryState>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, DomainError> {
        let initial_state = initial_state.into();

        if !states.contains_key(&initial_state) {
            return Err(DomainError::MissingInitialState(initial_state));
        }

        let known: Vec<String> = states.keys().cloned().collect();
        for (id, state) in states.iter_mut() {
            state.id = id.clone();
            state.is_terminal = state.actions.is_empty();

            let mut seen = std::collections::BTreeSet::new();
            for action in &state.actions {
                if !seen.insert(action.id.as_str()) {
                    return Err(DomainError::DuplicateActionId {
                        state: id.clone(),
                        action: action.id.clone(),
                    });
                }
                if !known.contains(&action.target_state) {
                    return Err(DomainError::UnknownTargetState {
                        state: id.clone(),
                        action: action.id.clone(),
                        target: action.target_state.clone(),
                    });
                }
            }
        }

        Ok(Self {
            title: title.into(),
            description: description.into(),
            initial_state,
            states,
            metadata,
        })
    }

    pub fn get_state(&self, state_id: &str) -> Option<&StoryState> {
        self.states.get(state_id)
    }

    pub fn terminal_states(&self) -> Vec<&StoryState> {
        self.states.values().filter(|s| s.is_terminal).collect()
    }

    /// Build a graph from the legacy flat shape:
    /// `{state_id: {"text": ..., "actions": {label: target_id}}}`.
    ///
    /// Choice ids are synthesized as `"{state_id}_{n}"`. The initial state
    /// is `"start"` when that key exists, otherwise the first key in map
    /// iteration order.
    pub fn from_legacy_format(
        data: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, DomainError> {
        let mut states = BTreeMap::new();

        for (state_id, state_data) in data {
            let mut actions = Vec::new();
            if let Some(raw_actions) = state_data.get("actions").and_then(|v| v.as_object()) {
                for (label, target) in raw_actions {
                    actions.push(ActionChoice {
                        id: format!("{}_{}", state_id, actions.len()),
                        text: label.clone(),
                        target_state: target.as_str().unwrap_or_default().to_string(),
                        description: None,
                    });
                }
            }

            states.insert(
                state_id.clone(),
                StoryState {
                    id: state_id.clone(),
                    text: state_data
                        .get("text")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    is_terminal: actions.is_empty(),
                    actions,
                    image_url: None,
                    metadata: serde_json::Map::new(),
                },
            );
        }

        let initial_state = if states.contains_key("start") {
            "start".to_string()
        } else {
            states
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| "start".to_string())
        };

        Self::new(
            "Generated Quest",
            "AI-generated interactive quest",
            initial_state,
            states,
            serde_json::Map::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(text: &str, actions: Vec<ActionChoice>) -> StoryState {
        StoryState {
            id: String::new(),
            text: text.to_string(),
            actions,
            is_terminal: false,
            image_url: None,
            metadata: serde_json::Map::new(),
        }
    }

    fn choice(id: &str, text: &str, target: &str) -> ActionChoice {
        ActionChoice {
            id: id.to_string(),
            text: text.to_string(),
            target_state: target.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_construction_fails_for_missing_initial_state() {
        let mut states = BTreeMap::new();
        states.insert("a".to_string(), state("Alpha.", vec![]));

        let err = StoryGraph::new("T", "D", "b", states, serde_json::Map::new()).unwrap_err();
        assert_eq!(err, DomainError::MissingInitialState("b".to_string()));
    }

    #[test]
    fn test_construction_fails_for_dangling_target() {
        let mut states = BTreeMap::new();
        states.insert(
            "start".to_string(),
            state("Go.", vec![choice("c0", "Jump", "nowhere")]),
        );

        let err = StoryGraph::new("T", "D", "start", states, serde_json::Map::new()).unwrap_err();
        assert!(matches!(err, DomainError::UnknownTargetState { target, .. } if target == "nowhere"));
    }

    #[test]
    fn test_construction_fails_for_duplicate_action_ids() {
        let mut states = BTreeMap::new();
        states.insert("end".to_string(), state("Done.", vec![]));
        states.insert(
            "start".to_string(),
            state(
                "Pick.",
                vec![choice("c", "Left", "end"), choice("c", "Right", "end")],
            ),
        );

        let err = StoryGraph::new("T", "D", "start", states, serde_json::Map::new()).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateActionId { .. }));
    }

    #[test]
    fn test_is_terminal_is_derived_not_trusted() {
        let mut states = BTreeMap::new();
        let mut lying = state("Not really over.", vec![choice("c0", "Continue", "end")]);
        lying.is_terminal = true;
        states.insert("start".to_string(), lying);
        states.insert("end".to_string(), state("Over.", vec![]));

        let graph = StoryGraph::new("T", "D", "start", states, serde_json::Map::new()).unwrap();
        assert!(!graph.get_state("start").unwrap().is_terminal);
        assert!(graph.get_state("end").unwrap().is_terminal);
        assert_eq!(graph.terminal_states().len(), 1);
    }

    fn legacy_fixture() -> serde_json::Map<String, serde_json::Value> {
        serde_json::from_str(
            r#"{
                "start": {
                    "text": "You stand at the vault door.",
                    "actions": {"Force the lock": "alarm", "Search for a key": "key_room"}
                },
                "key_room": {
                    "text": "A rusty key glints in the silt.",
                    "actions": {"Take it": "victory"}
                },
                "alarm": {"text": "Bells ring. Guards come.", "actions": {}},
                "victory": {"text": "The vault opens."}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_legacy_format_normalizes() {
        let graph = StoryGraph::from_legacy_format(&legacy_fixture()).unwrap();

        assert_eq!(graph.initial_state, "start");
        assert_eq!(graph.states.len(), 4);

        let start = graph.get_state("start").unwrap();
        assert_eq!(start.actions.len(), 2);
        assert!(start.actions.iter().all(|a| a.id.starts_with("start_")));
        assert!(!start.is_terminal);

        // No actions key and empty actions map both mean terminal
        assert!(graph.get_state("victory").unwrap().is_terminal);
        assert!(graph.get_state("alarm").unwrap().is_terminal);
    }

    #[test]
    fn test_from_legacy_format_round_trip_preserves_content() {
        let legacy = legacy_fixture();
        let graph = StoryGraph::from_legacy_format(&legacy).unwrap();

        for (state_id, raw) in &legacy {
            let converted = graph.get_state(state_id).unwrap();
            assert_eq!(
                converted.text,
                raw.get("text").and_then(|v| v.as_str()).unwrap_or_default()
            );

            let raw_actions = raw
                .get("actions")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();
            assert_eq!(converted.actions.len(), raw_actions.len());
            for action in &converted.actions {
                assert_eq!(
                    raw_actions.get(&action.text).and_then(|v| v.as_str()),
                    Some(action.target_state.as_str())
                );
            }
        }
    }

    #[test]
    fn test_from_legacy_format_without_start_uses_first_key() {
        let data: serde_json::Map<String, serde_json::Value> = serde_json::from_str(
            r#"{"cave": {"text": "Dark.", "actions": {}}, "ridge": {"text": "Windy."}}"#,
        )
        .unwrap();

        let graph = StoryGraph::from_legacy_format(&data).unwrap();
        assert_eq!(graph.initial_state, "cave");
    }
}
