//! Linked population/area share views over a small set of geographic entities.
//!
//! Raw records from an [`source::EntitySource`] are normalized into
//! [`entity::Entity`] values, projected into percentage shares for the
//! aggregate view, and re-projected into a population vs area comparison for
//! whichever entity is selected.

pub mod config;
pub mod entity;
pub mod error;
pub mod logging;
pub mod palette;
pub mod projection;
pub mod render;
pub mod selection;
pub mod session;
pub mod source;

pub use error::{CoreError, Result};
