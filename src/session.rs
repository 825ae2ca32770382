//! The per-session pipeline and the surface a renderer talks to.
//!
//! Each fetch resolution runs normalize, project and selection reset in that
//! order, once. Only the most recently started fetch may apply its result; a
//! fetch started later supersedes any fetch still in flight.

use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Config;
use crate::entity::{normalize, Entity, RawEntity, Window};
use crate::error::{CoreError, Result};
use crate::logging::{log, log_core_error, log_fetch, obj, v_str, Domain, Level, ProfileScope};
use crate::palette::{Color, Palette};
use crate::projection::{project, project_detail, DetailDataset, PercentageEntity};
use crate::selection::{SelectionController, SelectionState};
use crate::source::EntitySource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// New entity set installed.
    Applied { entities: usize },
    /// Fetch succeeded but nothing survived normalization.
    Empty,
    /// The source failed; the session now shows "no data".
    Failed,
    /// A newer fetch was started before this one resolved.
    Discarded,
}

pub struct Session {
    window: Window,
    palette: Palette,
    entities: Vec<Entity>,
    percentages: Vec<PercentageEntity>,
    selection: SelectionController,
    generation: u64,
    in_flight: Option<u64>,
    dataset_hash: Option<String>,
    last_error: Option<CoreError>,
}

impl Session {
    pub fn new(window: Window, palette: Palette) -> Self {
        Self {
            window,
            palette,
            entities: Vec::new(),
            percentages: Vec::new(),
            selection: SelectionController::new(),
            generation: 0,
            in_flight: None,
            dataset_hash: None,
            last_error: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::new(cfg.window()?, cfg.palette()?))
    }

    // -------------------------------------------------------------------------
    // Fetch lifecycle
    // -------------------------------------------------------------------------

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        if let Some(stale) = self.in_flight.replace(self.generation) {
            log(
                Level::Debug,
                Domain::Source,
                "fetch_superseded",
                obj(&[
                    ("stale_generation", json!(stale)),
                    ("generation", json!(self.generation)),
                ]),
            );
        }
        FetchTicket {
            generation: self.generation,
        }
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Applies a fetch result if `ticket` belongs to the latest fetch.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<Vec<RawEntity>>,
    ) -> FetchOutcome {
        if self.in_flight != Some(ticket.generation) {
            log(
                Level::Info,
                Domain::Source,
                "fetch_discarded",
                obj(&[("generation", json!(ticket.generation))]),
            );
            return FetchOutcome::Discarded;
        }
        self.in_flight = None;
        match result {
            Ok(raw) => match self.on_entities_replaced(&raw) {
                Ok(count) => FetchOutcome::Applied { entities: count },
                Err(_) => FetchOutcome::Empty,
            },
            Err(err) => {
                self.on_source_failed(&format!("{:#}", err));
                FetchOutcome::Failed
            }
        }
    }

    /// Replaces the entity set wholesale: normalize, project, reset selection.
    ///
    /// Returns the number of entities installed, or `SourceEmpty`.
    pub fn on_entities_replaced(&mut self, raw: &[RawEntity]) -> Result<usize> {
        let _scope = ProfileScope::with_context("entities_replaced", &[("raw", json!(raw.len()))]);

        let normalized = normalize(raw, self.window);
        let entities = match normalized {
            Ok(entities) => entities,
            Err(err) => {
                self.clear();
                log_core_error(Domain::Pipeline, "normalize_empty", &err);
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        self.percentages = project(&entities);
        self.dataset_hash = Some(dataset_hash(&entities));
        self.entities = entities;
        self.selection.reset();
        self.last_error = None;

        log(
            Level::Info,
            Domain::Pipeline,
            "entities_replaced",
            obj(&[
                ("raw", json!(raw.len())),
                ("entities", json!(self.entities.len())),
                ("window_start", json!(self.window.start)),
                ("window_end", json!(self.window.end)),
                ("dataset_hash", json!(self.dataset_hash)),
            ]),
        );
        Ok(self.entities.len())
    }

    /// Leaves the session empty and surfaces `SourceUnavailable`.
    pub fn on_source_failed(&mut self, reason: &str) {
        self.clear();
        let err = CoreError::SourceUnavailable {
            reason: reason.to_string(),
        };
        log_core_error(Domain::Source, "source_unavailable", &err);
        self.last_error = Some(err);
    }

    fn clear(&mut self) {
        self.entities.clear();
        self.percentages.clear();
        self.dataset_hash = None;
        self.selection.reset();
    }

    // -------------------------------------------------------------------------
    // Renderer surface
    // -------------------------------------------------------------------------

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn percentages(&self) -> &[PercentageEntity] {
        &self.percentages
    }

    pub fn selection(&self) -> &SelectionState {
        self.selection.state()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn last_error(&self) -> Option<&CoreError> {
        self.last_error.as_ref()
    }

    pub fn dataset_hash(&self) -> Option<&str> {
        self.dataset_hash.as_deref()
    }

    /// Handles a renderer click. Selection errors are recovered here: the
    /// controller falls back to Unselected and the error is only logged.
    ///
    /// Returns whether a selection is active afterwards.
    pub fn select(&mut self, name: &str, index: usize) -> bool {
        match self.selection.select(name, index, &self.entities) {
            Ok(()) => {
                log(
                    Level::Debug,
                    Domain::Selection,
                    "selected",
                    obj(&[
                        ("name", v_str(name)),
                        ("index", json!(self.selection.selected_index())),
                    ]),
                );
                true
            }
            Err(err) => {
                log_core_error(Domain::Selection, "selection_recovered", &err);
                false
            }
        }
    }

    /// Background click: back to Unselected, which hides the detail view.
    pub fn reset_selection(&mut self) {
        if self.selection.is_selected() {
            log(Level::Debug, Domain::Selection, "reset", obj(&[]));
        }
        self.selection.reset();
    }

    /// The detail dataset for the current selection, if any.
    pub fn detail(&self) -> Option<DetailDataset> {
        match project_detail(&self.entities, self.selection.state()) {
            Ok(detail) => detail,
            Err(err) => {
                log_core_error(Domain::Selection, "detail_unresolved", &err);
                None
            }
        }
    }

    pub fn color_for(&self, position: usize) -> Color {
        self.palette.color_for(position)
    }

    pub fn detail_color_for(&self, slot: usize) -> Color {
        self.palette.detail_color_for(slot)
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let aggregate = self
            .percentages
            .iter()
            .enumerate()
            .map(|(i, p)| AggregateSlice {
                position: i,
                color: self.color_for(i),
                share: p.clone(),
            })
            .collect();
        let detail = self.detail().map(|data| DetailView {
            name: self.selection.selected_name().unwrap_or_default().to_string(),
            slices: data
                .iter()
                .enumerate()
                .map(|(slot, d)| DetailSlice {
                    label: d.label.as_str(),
                    value: d.value,
                    color: self.detail_color_for(slot),
                })
                .collect(),
        });
        ViewSnapshot {
            generation: self.generation,
            dataset_hash: self.dataset_hash.clone(),
            aggregate,
            selection: self.selection.state().clone(),
            detail,
            error: self.last_error.as_ref().map(|e| ErrorView {
                code: e.code(),
                message: e.to_string(),
            }),
        }
    }
}

/// Content fingerprint of the normalized entity set, in order.
fn dataset_hash(entities: &[Entity]) -> String {
    let mut hasher = Sha256::new();
    for e in entities {
        hasher.update(e.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(e.population.to_le_bytes());
        hasher.update(e.area.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

// =============================================================================
// Serializable view state
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AggregateSlice {
    pub position: usize,
    pub color: Color,
    #[serde(flatten)]
    pub share: PercentageEntity,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailSlice {
    pub label: &'static str,
    pub value: f64,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailView {
    pub name: String,
    pub slices: Vec<DetailSlice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorView {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub generation: u64,
    pub dataset_hash: Option<String>,
    pub aggregate: Vec<AggregateSlice>,
    pub selection: SelectionState,
    pub detail: Option<DetailView>,
    pub error: Option<ErrorView>,
}

// =============================================================================
// Shared handle
// =============================================================================

/// A session shared between UI threads. The mutex is the single writer queue
/// for selection events; fetches never hold it across the await.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn select(&self, name: &str, index: usize) -> bool {
        self.lock().select(name, index)
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.lock().snapshot()
    }

    /// Fetches from `source` and applies the result unless a newer refresh
    /// started in the meantime.
    pub async fn refresh<S>(&self, source: &S) -> FetchOutcome
    where
        S: EntitySource + Sync + ?Sized,
    {
        let ticket = self.lock().begin_fetch();
        let result = source.fetch().await;
        let records = result.as_ref().ok().map(Vec::len);
        let outcome = self.lock().complete_fetch(ticket, result);
        let label = match &outcome {
            FetchOutcome::Applied { .. } => "applied",
            FetchOutcome::Empty => "empty",
            FetchOutcome::Failed => "failed",
            FetchOutcome::Discarded => "discarded",
        };
        log_fetch(&source.describe(), ticket.generation(), label, records);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn abc() -> Vec<RawEntity> {
        vec![
            RawEntity::new("A", 100, 10.0),
            RawEntity::new("B", 300, 30.0),
            RawEntity::new("C", 600, 60.0),
        ]
    }

    fn session() -> Session {
        Session::new(Window::new(0, 9).unwrap(), Palette::default())
    }

    #[test]
    fn test_replacement_projects_and_hashes() {
        let mut s = session();
        assert_eq!(s.on_entities_replaced(&abc()).unwrap(), 3);
        assert_eq!(s.percentages().len(), 3);
        assert!((s.percentages()[2].population_pct - 60.0).abs() < 1e-9);
        assert_eq!(s.dataset_hash().map(str::len), Some(64));
        assert!(s.last_error().is_none());
    }

    #[test]
    fn test_replacement_resets_selection() {
        let mut s = session();
        s.on_entities_replaced(&abc()).unwrap();
        assert!(s.select("B", 1));
        assert!(s.detail().is_some());
        s.on_entities_replaced(&abc()).unwrap();
        assert_eq!(s.selection(), &SelectionState::Unselected);
        assert!(s.detail().is_none());
    }

    #[test]
    fn test_empty_replacement_surfaces_error() {
        let mut s = session();
        s.on_entities_replaced(&abc()).unwrap();
        let err = s.on_entities_replaced(&[]).unwrap_err();
        assert!(matches!(err, CoreError::SourceEmpty { .. }));
        assert!(s.entities().is_empty());
        assert!(s.percentages().is_empty());
        assert!(s.last_error().unwrap().is_user_visible());
        assert!(s.dataset_hash().is_none());
    }

    #[test]
    fn test_source_failure_clears_data() {
        let mut s = session();
        s.on_entities_replaced(&abc()).unwrap();
        s.select("A", 0);
        s.on_source_failed("connection refused");
        assert!(s.percentages().is_empty());
        assert!(s.detail().is_none());
        assert_eq!(s.last_error().unwrap().code(), "GEO-2001");
    }

    #[test]
    fn test_superseded_fetch_is_discarded() {
        let mut s = session();
        let first = s.begin_fetch();
        let second = s.begin_fetch();
        assert_eq!(s.complete_fetch(first, Ok(abc())), FetchOutcome::Discarded);
        assert!(s.entities().is_empty());
        assert!(s.fetch_in_flight());
        assert_eq!(
            s.complete_fetch(second, Ok(abc())),
            FetchOutcome::Applied { entities: 3 }
        );
        assert!(!s.fetch_in_flight());
    }

    #[test]
    fn test_completed_ticket_cannot_apply_twice() {
        let mut s = session();
        let ticket = s.begin_fetch();
        s.complete_fetch(ticket, Ok(abc()));
        s.select("C", 2);
        assert_eq!(
            s.complete_fetch(ticket, Ok(Vec::new())),
            FetchOutcome::Discarded
        );
        assert!(s.detail().is_some());
    }

    #[test]
    fn test_failed_fetch_outcome() {
        let mut s = session();
        let ticket = s.begin_fetch();
        let outcome = s.complete_fetch(ticket, Err(anyhow!("dns failure")));
        assert_eq!(outcome, FetchOutcome::Failed);
        match s.last_error() {
            Some(CoreError::SourceUnavailable { reason }) => assert!(reason.contains("dns")),
            other => panic!("unexpected error state: {:?}", other),
        }
    }

    #[test]
    fn test_select_unknown_name_recovers() {
        let mut s = session();
        s.on_entities_replaced(&abc()).unwrap();
        assert!(s.select("B", 1));
        assert!(!s.select("Q", 1));
        assert_eq!(s.selection(), &SelectionState::Unselected);
        assert!(s.last_error().is_none());
    }

    #[test]
    fn test_reset_selection_hides_detail() {
        let mut s = session();
        s.on_entities_replaced(&abc()).unwrap();
        assert!(s.select("A", 0));
        s.reset_selection();
        assert_eq!(s.selection(), &SelectionState::Unselected);
        assert!(s.detail().is_none());
        assert!(s.snapshot().detail.is_none());
    }

    #[test]
    fn test_snapshot_shape() {
        let mut s = session();
        s.on_entities_replaced(&abc()).unwrap();
        s.select("B", 1);
        let snap = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(snap["aggregate"][0]["name"], "A");
        assert_eq!(snap["aggregate"][0]["color"], "#e64cc2");
        assert_eq!(snap["selection"]["state"], "selected");
        assert_eq!(snap["detail"]["name"], "B");
        assert_eq!(snap["detail"]["slices"][0]["label"], "Population");
        assert_eq!(snap["detail"]["slices"][0]["value"], 300.0);
        assert_eq!(snap["detail"]["slices"][1]["color"], "#ff7850");
        assert!(snap["error"].is_null());
    }

    #[test]
    fn test_dataset_hash_tracks_content() {
        let a = dataset_hash(&normalize(&abc(), Window::new(0, 3).unwrap()).unwrap());
        let b = dataset_hash(&normalize(&abc(), Window::new(0, 2).unwrap()).unwrap());
        assert_ne!(a, b);
        let again = dataset_hash(&normalize(&abc(), Window::new(0, 3).unwrap()).unwrap());
        assert_eq!(a, again);
    }
}
