use serde::Serialize;

use crate::entity::Entity;
use crate::error::{CoreError, Result};

/// Single-selection state. `index` always points at an entity named `name`
/// in the entity set the selection was resolved against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SelectionState {
    #[default]
    Unselected,
    Selected { name: String, index: usize },
}

/// The minimal payload a renderer hands over on interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    Select { name: String, index: usize },
    Reset,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_selected(&self) -> bool {
        matches!(self.state, SelectionState::Selected { .. })
    }

    pub fn selected_name(&self) -> Option<&str> {
        match &self.state {
            SelectionState::Selected { name, .. } => Some(name),
            SelectionState::Unselected => None,
        }
    }

    pub fn selected_index(&self) -> Option<usize> {
        match self.state {
            SelectionState::Selected { index, .. } => Some(index),
            SelectionState::Unselected => None,
        }
    }

    pub fn select(&mut self, name: &str, index: usize, entities: &[Entity]) -> Result<()> {
        self.apply(
            SelectionEvent::Select {
                name: name.to_string(),
                index,
            },
            entities,
        )
    }

    pub fn reset(&mut self) {
        self.state = SelectionState::Unselected;
    }

    /// Applies one event against the current entity set.
    ///
    /// A stale index is re-resolved from the name. When the name is gone the
    /// controller falls back to Unselected and reports why.
    pub fn apply(&mut self, event: SelectionEvent, entities: &[Entity]) -> Result<()> {
        match event {
            SelectionEvent::Reset => {
                self.reset();
                Ok(())
            }
            SelectionEvent::Select { name, index } => match resolve_index(&name, index, entities) {
                Some(index) => {
                    self.state = SelectionState::Selected { name, index };
                    Ok(())
                }
                None => {
                    self.reset();
                    if entities.is_empty() {
                        Err(CoreError::SelectionNotFound { name })
                    } else {
                        Err(CoreError::StaleSelection { name })
                    }
                }
            },
        }
    }
}

/// Trusts `hint` only if it names the right entity, else takes the first
/// entity with that name.
fn resolve_index(name: &str, hint: usize, entities: &[Entity]) -> Option<usize> {
    if entities.get(hint).is_some_and(|e| e.name == name) {
        return Some(hint);
    }
    entities.iter().position(|e| e.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(names: &[&str]) -> Vec<Entity> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Entity {
                name: n.to_string(),
                population: (i as u64 + 1) * 10,
                area: (i as f64 + 1.0) * 2.0,
            })
            .collect()
    }

    #[test]
    fn test_starts_unselected() {
        let ctl = SelectionController::new();
        assert_eq!(ctl.state(), &SelectionState::Unselected);
        assert!(ctl.selected_name().is_none());
        assert!(ctl.selected_index().is_none());
    }

    #[test]
    fn test_select_valid() {
        let set = entities(&["A", "B", "C"]);
        let mut ctl = SelectionController::new();
        ctl.select("B", 1, &set).unwrap();
        assert_eq!(ctl.selected_name(), Some("B"));
        assert_eq!(ctl.selected_index(), Some(1));
    }

    #[test]
    fn test_stale_index_is_reresolved() {
        let set = entities(&["C", "A", "B"]);
        let mut ctl = SelectionController::new();
        ctl.select("B", 1, &set).unwrap();
        assert_eq!(ctl.selected_index(), Some(2));
    }

    #[test]
    fn test_out_of_range_index_is_reresolved() {
        let set = entities(&["A", "B"]);
        let mut ctl = SelectionController::new();
        ctl.select("A", 40, &set).unwrap();
        assert_eq!(ctl.selected_index(), Some(0));
    }

    #[test]
    fn test_duplicate_names_keep_matching_hint() {
        let set = entities(&["A", "A"]);
        let mut ctl = SelectionController::new();
        ctl.select("A", 1, &set).unwrap();
        assert_eq!(ctl.selected_index(), Some(1));
    }

    #[test]
    fn test_vanished_name_is_stale() {
        let set = entities(&["A", "B"]);
        let mut ctl = SelectionController::new();
        ctl.select("A", 0, &set).unwrap();
        let err = ctl.select("Z", 0, &set).unwrap_err();
        assert_eq!(err, CoreError::StaleSelection { name: "Z".into() });
        assert!(!ctl.is_selected());
    }

    #[test]
    fn test_select_on_empty_set_not_found() {
        let mut ctl = SelectionController::new();
        let err = ctl.select("A", 0, &[]).unwrap_err();
        assert_eq!(err, CoreError::SelectionNotFound { name: "A".into() });
        assert_eq!(ctl.state(), &SelectionState::Unselected);
    }

    #[test]
    fn test_reset_event() {
        let set = entities(&["A"]);
        let mut ctl = SelectionController::new();
        ctl.select("A", 0, &set).unwrap();
        ctl.apply(SelectionEvent::Reset, &set).unwrap();
        assert!(!ctl.is_selected());
    }

    #[test]
    fn test_state_serializes_tagged() {
        let state = SelectionState::Selected {
            name: "A".into(),
            index: 0,
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "selected");
        assert_eq!(json["name"], "A");
    }
}
