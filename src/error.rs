//! Error taxonomy for the chart core.
//!
//! Only source failures are meant to reach the renderer. Selection errors are
//! consistency violations that the session recovers from locally.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("[GEO-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[GEO-1002] palette must contain at least one color")]
    EmptyPalette,

    #[error("[GEO-1003] invalid color {value:?}: expected #rrggbb")]
    InvalidColor { value: String },

    #[error("[GEO-2001] entity source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("[GEO-2002] entity source yielded no usable records in window [{start}, {end})")]
    SourceEmpty { start: usize, end: usize },

    #[error("[GEO-3001] stale selection: {name:?} is no longer in the entity set")]
    StaleSelection { name: String },

    #[error("[GEO-3002] selection {name:?} not found")]
    SelectionNotFound { name: String },
}

impl CoreError {
    /// Stable machine-parseable code, used as the `code` field in logs.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "GEO-1001",
            Self::EmptyPalette => "GEO-1002",
            Self::InvalidColor { .. } => "GEO-1003",
            Self::SourceUnavailable { .. } => "GEO-2001",
            Self::SourceEmpty { .. } => "GEO-2002",
            Self::StaleSelection { .. } => "GEO-3001",
            Self::SelectionNotFound { .. } => "GEO-3002",
        }
    }

    /// Errors the renderer should show as "no data".
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::SourceEmpty { .. }
        )
    }

    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            Self::StaleSelection { .. } | Self::SelectionNotFound { .. }
        )
    }
}
