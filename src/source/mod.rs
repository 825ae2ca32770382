//! Adapters for the entity source collaborator.
//!
//! The core only sees `EntitySource::fetch`. Transport, timeouts and retry
//! policy live in the adapters.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::entity::RawEntity;

mod rest;
pub mod retry;

pub use rest::RestCountriesSource;

#[async_trait]
pub trait EntitySource {
    async fn fetch(&self) -> Result<Vec<RawEntity>>;

    /// Short human-readable identity used in logs.
    fn describe(&self) -> String;
}

/// Fixed in-memory records, for offline use and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<RawEntity>,
}

impl StaticSource {
    pub fn new(records: Vec<RawEntity>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl EntitySource for StaticSource {
    async fn fetch(&self) -> Result<Vec<RawEntity>> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("static({} records)", self.records.len())
    }
}

/// A source that always fails with the given reason.
#[derive(Debug, Clone)]
pub struct FailingSource {
    reason: String,
}

impl FailingSource {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl EntitySource for FailingSource {
    async fn fetch(&self) -> Result<Vec<RawEntity>> {
        Err(anyhow!("{}", self.reason))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_returns_records() {
        let source = StaticSource::new(vec![RawEntity::new("A", 1, 1.0)]);
        let records = source.fetch().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(source.describe(), "static(1 records)");
    }

    #[tokio::test]
    async fn test_failing_source() {
        let err = FailingSource::new("offline").fetch().await.unwrap_err();
        assert_eq!(err.to_string(), "offline");
    }
}
