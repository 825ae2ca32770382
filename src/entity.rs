use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};

/// One record as delivered by the entity source. Any field may be absent.
///
/// Fields of the wrong type decode as `None`, so one malformed record is
/// dropped by `normalize` instead of failing the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_population")]
    pub population: Option<u64>,
    #[serde(default, deserialize_with = "lenient_area")]
    pub area: Option<f64>,
}

fn lenient_name<'de, D>(d: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Whole, non-negative counts only. `2.5e3` is accepted, `12.5` and `-4` are not.
fn lenient_population<'de, D>(d: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Number(n) = Value::deserialize(d)? else {
        return Ok(None);
    };
    if let Some(count) = n.as_u64() {
        return Ok(Some(count));
    }
    Ok(n.as_f64()
        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64)
        .map(|f| f as u64))
}

fn lenient_area<'de, D>(d: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        _ => None,
    })
}

impl RawEntity {
    pub fn new(name: &str, population: u64, area: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            population: Some(population),
            area: Some(area),
        }
    }

    /// Converts into a validated entity, or `None` if any field is missing,
    /// zero, or not finite.
    fn validated(&self) -> Option<Entity> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        let population = self.population.filter(|p| *p > 0)?;
        let area = self.area.filter(|a| a.is_finite() && *a > 0.0)?;
        Some(Entity {
            name: name.to_string(),
            population,
            area,
        })
    }
}

/// A geographic unit with strictly positive population and area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub population: u64,
    pub area: f64,
}

/// Half-open index window `[start, end)` applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(CoreError::InvalidConfig {
                details: format!("window start {} is past end {}", start, end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Filters `raw` down to valid entities and keeps those inside `window`.
///
/// Source order is preserved and duplicate names are kept. An empty result is
/// reported as `SourceEmpty` so callers can show "no data".
pub fn normalize(raw: &[RawEntity], window: Window) -> Result<Vec<Entity>> {
    let entities: Vec<Entity> = raw
        .iter()
        .filter_map(RawEntity::validated)
        .skip(window.start)
        .take(window.len())
        .collect();

    if entities.is_empty() {
        return Err(CoreError::SourceEmpty {
            start: window.start,
            end: window.end,
        });
    }
    Ok(entities)
}
