//! Stream definitions: the named nodes of a content pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{SourceConfig, TransformConfig};
use crate::StreamId;

/// Lifecycle status of a stream. Set by fetch/execution layers, never by
/// the graph engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    #[default]
    Active,
    Paused,
    Error,
    Fetching,
}

/// Whether a stream produces content (source) or re-emits it (transform).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum StreamKind {
    Source(SourceConfig),
    Transform(TransformConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub id: StreamId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: StreamStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetched_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub kind: StreamKind,
}

impl Stream {
    pub fn is_source(&self) -> bool {
        matches!(self.kind, StreamKind::Source(_))
    }

    pub fn is_transform(&self) -> bool {
        matches!(self.kind, StreamKind::Transform(_))
    }

    pub fn source_config(&self) -> Option<&SourceConfig> {
        match &self.kind {
            StreamKind::Source(c) => Some(c),
            StreamKind::Transform(_) => None,
        }
    }

    pub fn transform_config(&self) -> Option<&TransformConfig> {
        match &self.kind {
            StreamKind::Transform(c) => Some(c),
            StreamKind::Source(_) => None,
        }
    }

    pub fn transform_config_mut(&mut self) -> Option<&mut TransformConfig> {
        match &mut self.kind {
            StreamKind::Transform(c) => Some(c),
            StreamKind::Source(_) => None,
        }
    }

    /// Declared input ids. Sources are graph roots and have none.
    pub fn input_ids(&self) -> &[StreamId] {
        match &self.kind {
            StreamKind::Source(_) => &[],
            StreamKind::Transform(c) => c.input_ids(),
        }
    }

    /// Human-readable kind name, e.g. "RSS Feed" or "AI Tagger".
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            StreamKind::Source(c) => c.type_name(),
            StreamKind::Transform(c) => c.type_name(),
        }
    }

    /// Record a successful fetch at `at`, clearing any previous error.
    pub fn mark_fetched(&mut self, at: DateTime<Utc>) {
        self.status = StreamStatus::Active;
        self.last_fetched_at = Some(at);
        self.error_message = None;
    }

    /// Put the stream into the `Error` state with a message.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = StreamStatus::Error;
        self.error_message = Some(message.into());
    }
}
