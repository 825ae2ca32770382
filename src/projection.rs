//! Pure derivations from the normalized entity set.
//!
//! `project` feeds the aggregate share view, `project_detail` feeds the
//! per-entity population vs area view.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{CoreError, Result};
use crate::selection::SelectionState;

/// An entity's share of the total population and area, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageEntity {
    pub name: String,
    pub population_pct: f64,
    pub area_pct: f64,
}

/// Projects entities into percentage form, 1:1 and order-preserving.
///
/// Returns an empty sequence when the total population is zero, which only
/// happens for an empty input.
pub fn project(entities: &[Entity]) -> Vec<PercentageEntity> {
    // u128 so that no set of u64 populations can overflow the total.
    let total_population: u128 = entities.iter().map(|e| u128::from(e.population)).sum();
    let total_area: f64 = entities.iter().map(|e| e.area).sum();
    if total_population == 0 || total_area <= 0.0 {
        return Vec::new();
    }

    let total_population = total_population as f64;
    entities
        .iter()
        .map(|e| PercentageEntity {
            name: e.name.clone(),
            population_pct: 100.0 * e.population as f64 / total_population,
            area_pct: 100.0 * e.area / total_area,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailLabel {
    Population,
    Area,
}

impl DetailLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLabel::Population => "Population",
            DetailLabel::Area => "Area",
        }
    }
}

/// One slice of the detail view. `value` is the raw magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailDatum {
    pub label: DetailLabel,
    pub value: f64,
}

/// Always population first, area second.
pub type DetailDataset = [DetailDatum; 2];

/// Builds the detail dataset for the current selection.
///
/// The entity is looked up by name rather than index so a reordered set still
/// resolves. A selected name missing from `entities` is `SelectionNotFound`.
pub fn project_detail(
    entities: &[Entity],
    selection: &SelectionState,
) -> Result<Option<DetailDataset>> {
    let SelectionState::Selected { name, index } = selection else {
        return Ok(None);
    };

    // Prefer the recorded position when it still matches, so duplicates resolve
    // to the entity that was actually picked.
    let entity = entities
        .get(*index)
        .filter(|e| &e.name == name)
        .or_else(|| entities.iter().find(|e| &e.name == name))
        .ok_or_else(|| CoreError::SelectionNotFound { name: name.clone() })?;

    Ok(Some([
        DetailDatum {
            label: DetailLabel::Population,
            value: entity.population as f64,
        },
        DetailDatum {
            label: DetailLabel::Area,
            value: entity.area,
        },
    ]))
}
