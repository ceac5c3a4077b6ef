//! Shared types and errors for the Rivulet stream graph.
//!
//! This crate provides the foundational types used across the other Rivulet crates:
//! - `RivuletError`: unified error taxonomy
//! - `StreamId`: opaque identifier shared by streams and graph nodes
//! - `Stream`: a source or transform definition with its configuration
//! - `SourceConfig` / `TransformConfig`: closed sets of per-kind parameters

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod stream;

pub use config::{
    FilterConfig, FilterField, FilterMode, FilterOperator, FilterRule, LimiterConfig,
    MixStrategy, MixerConfig, RelevanceScorerConfig, RssConfig, SemanticFilterConfig,
    SortKey, SortOrder, SorterConfig, SourceConfig, SummarizerConfig, SummaryStyle,
    TaggerConfig, TodoistConfig, TransformConfig, YouTubeConfig,
};
pub use stream::{Stream, StreamKind, StreamStatus};

/// Unified error type for all Rivulet subsystems.
#[derive(Debug, thiserror::Error)]
pub enum RivuletError {
    // === Construction Errors ===
    #[error("Invalid {kind} configuration: {message}")]
    InvalidConfig { kind: String, message: String },

    // === Registry / Graph Errors ===
    #[error("Unknown stream '{0}'")]
    UnknownStream(StreamId),

    #[error("Stream '{0}' is already registered")]
    DuplicateStream(StreamId),

    #[error("Stream graph validation failed: {0}")]
    ValidationError(String),

    #[error(
        "Execution order is incomplete: {scheduled} of {total} streams scheduled, blocked: {}",
        join_ids(.unscheduled)
    )]
    IncompleteOrder {
        scheduled: usize,
        total: usize,
        unscheduled: Vec<StreamId>,
    },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RivuletError {
    /// Shorthand for an [`InvalidConfig`](RivuletError::InvalidConfig) error.
    pub fn invalid_config(kind: impl Into<String>, message: impl Into<String>) -> Self {
        RivuletError::InvalidConfig {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if a builder refused to produce a stream.
    pub fn is_construction_error(&self) -> bool {
        matches!(self, RivuletError::InvalidConfig { .. })
    }

    /// Returns `true` if the error describes the shape of the graph rather
    /// than a failure of the surrounding process.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            RivuletError::ValidationError(_) | RivuletError::IncompleteOrder { .. }
        )
    }
}

fn join_ids(ids: &[StreamId]) -> String {
    ids.iter()
        .map(StreamId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A convenience alias for `Result<T, RivuletError>`.
pub type Result<T> = std::result::Result<T, RivuletError>;

// ---------------------------------------------------------------------------
// StreamId: identity shared by streams and graph nodes
// ---------------------------------------------------------------------------

/// Opaque stream identifier.
///
/// Stream ids and graph node ids live in the same namespace: a node's id is
/// always the id of the stream it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Generate a fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an existing id, e.g. one read back from storage.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StreamId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StreamId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StreamId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
