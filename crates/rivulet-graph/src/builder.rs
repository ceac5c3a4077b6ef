//! Stream construction and edge mutations.
//!
//! [`StreamBuilder`] produces fully formed [`Stream`]s (fresh id, `Active`
//! status) after checking their configuration; it never touches a registry.
//! [`add_edge`] and [`remove_edge`] are the only way edges should change
//! once streams are registered, because they keep each transform's recorded
//! inputs consistent with the edge set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rivulet_types::{
    FilterConfig, FilterMode, FilterOperator, FilterRule, LimiterConfig, MixStrategy,
    MixerConfig, RelevanceScorerConfig, Result, RivuletError, RssConfig, SemanticFilterConfig,
    SortKey, SortOrder, SorterConfig, SourceConfig, Stream, StreamId, StreamKind, StreamStatus,
    SummarizerConfig, SummaryStyle, TaggerConfig, TodoistConfig, TransformConfig, YouTubeConfig,
};

use crate::graph::{DagEdge, StreamGraph};
use crate::registry::StreamRegistry;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Fallback values for optional builder parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderDefaults {
    pub rss_max_items: u32,
    pub rss_refresh_interval_minutes: u32,
    pub mixer_strategy: MixStrategy,
    pub filter_mode: FilterMode,
    pub sort_order: SortOrder,
}

impl Default for BuilderDefaults {
    fn default() -> Self {
        Self {
            rss_max_items: 50,
            rss_refresh_interval_minutes: 30,
            mixer_strategy: MixStrategy::Interleave,
            filter_mode: FilterMode::Exclude,
            sort_order: SortOrder::Desc,
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RssOptions {
    pub description: Option<String>,
    pub max_items: Option<u32>,
    pub refresh_interval_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct MixerOptions {
    pub description: Option<String>,
    pub weights: Option<BTreeMap<StreamId, f64>>,
    pub strategy: Option<MixStrategy>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub description: Option<String>,
    pub mode: Option<FilterMode>,
}

#[derive(Debug, Clone, Default)]
pub struct SorterOptions {
    pub description: Option<String>,
    pub order: Option<SortOrder>,
}

#[derive(Debug, Clone, Default)]
pub struct SummarizerOptions {
    pub description: Option<String>,
    pub model: Option<String>,
    pub max_length: Option<u32>,
    pub style: Option<SummaryStyle>,
}

#[derive(Debug, Clone, Default)]
pub struct TaggerOptions {
    pub description: Option<String>,
    pub model: Option<String>,
    pub categories: Vec<String>,
    pub max_tags: Option<u32>,
}

// ---------------------------------------------------------------------------
// StreamBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct StreamBuilder {
    defaults: BuilderDefaults,
}

impl StreamBuilder {
    pub fn new(defaults: BuilderDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &BuilderDefaults {
        &self.defaults
    }

    /// Build a source from an arbitrary source configuration.
    pub fn create_source(
        &self,
        name: &str,
        config: SourceConfig,
        description: Option<String>,
    ) -> Result<Stream> {
        check_name(config.tag(), name)?;
        validate_source_config(&config)?;
        Ok(new_stream(name, description, StreamKind::Source(config)))
    }

    pub fn create_rss_source(&self, name: &str, feed_url: &str, opts: RssOptions) -> Result<Stream> {
        let config = SourceConfig::Rss(RssConfig {
            feed_url: feed_url.trim().to_string(),
            max_items: opts.max_items.unwrap_or(self.defaults.rss_max_items),
            refresh_interval_minutes: opts
                .refresh_interval_minutes
                .unwrap_or(self.defaults.rss_refresh_interval_minutes),
        });
        self.create_source(name, config, opts.description)
    }

    pub fn create_youtube_source(
        &self,
        name: &str,
        config: YouTubeConfig,
        description: Option<String>,
    ) -> Result<Stream> {
        self.create_source(name, SourceConfig::YouTube(config), description)
    }

    pub fn create_todoist_source(
        &self,
        name: &str,
        config: TodoistConfig,
        description: Option<String>,
    ) -> Result<Stream> {
        self.create_source(name, SourceConfig::Todoist(config), description)
    }

    /// Build a transform from an arbitrary transform configuration.
    pub fn create_transform(
        &self,
        name: &str,
        config: TransformConfig,
        description: Option<String>,
    ) -> Result<Stream> {
        check_name(config.tag(), name)?;
        validate_transform_config(&config)?;
        Ok(new_stream(name, description, StreamKind::Transform(config)))
    }

    /// A mixer may start with no inputs; edges added later append to it.
    pub fn create_mixer(
        &self,
        name: &str,
        input_stream_ids: Vec<StreamId>,
        opts: MixerOptions,
    ) -> Result<Stream> {
        let config = TransformConfig::Mixer(MixerConfig {
            input_stream_ids,
            weights: opts.weights,
            strategy: opts.strategy.unwrap_or(self.defaults.mixer_strategy),
        });
        self.create_transform(name, config, opts.description)
    }

    pub fn create_filter(
        &self,
        name: &str,
        input_stream_id: StreamId,
        rules: Vec<FilterRule>,
        opts: FilterOptions,
    ) -> Result<Stream> {
        let config = TransformConfig::Filter(FilterConfig {
            input_stream_id: Some(input_stream_id),
            rules,
            mode: opts.mode.unwrap_or(self.defaults.filter_mode),
        });
        self.create_transform(name, config, opts.description)
    }

    pub fn create_sorter(
        &self,
        name: &str,
        input_stream_id: StreamId,
        sort_by: SortKey,
        opts: SorterOptions,
    ) -> Result<Stream> {
        let config = TransformConfig::Sorter(SorterConfig {
            input_stream_id: Some(input_stream_id),
            sort_by,
            order: opts.order.unwrap_or(self.defaults.sort_order),
        });
        self.create_transform(name, config, opts.description)
    }

    pub fn create_limiter(
        &self,
        name: &str,
        input_stream_id: StreamId,
        max_items: u32,
        description: Option<String>,
    ) -> Result<Stream> {
        let config = TransformConfig::Limiter(LimiterConfig {
            input_stream_id: Some(input_stream_id),
            max_items,
        });
        self.create_transform(name, config, description)
    }

    pub fn create_summarizer(
        &self,
        name: &str,
        input_stream_id: StreamId,
        opts: SummarizerOptions,
    ) -> Result<Stream> {
        let config = TransformConfig::LlmSummarizer(SummarizerConfig {
            input_stream_id: Some(input_stream_id),
            model: opts.model,
            max_length: opts.max_length,
            style: opts.style,
        });
        self.create_transform(name, config, opts.description)
    }

    pub fn create_tagger(
        &self,
        name: &str,
        input_stream_id: StreamId,
        opts: TaggerOptions,
    ) -> Result<Stream> {
        let config = TransformConfig::LlmTagger(TaggerConfig {
            input_stream_id: Some(input_stream_id),
            model: opts.model,
            categories: opts.categories,
            max_tags: opts.max_tags,
        });
        self.create_transform(name, config, opts.description)
    }

    pub fn create_relevance_scorer(
        &self,
        name: &str,
        input_stream_id: StreamId,
        interests: Vec<String>,
        threshold: Option<f64>,
        model: Option<String>,
    ) -> Result<Stream> {
        let config = TransformConfig::LlmRelevanceScorer(RelevanceScorerConfig {
            input_stream_id: Some(input_stream_id),
            model,
            interests,
            threshold,
        });
        self.create_transform(name, config, None)
    }

    pub fn create_semantic_filter(
        &self,
        name: &str,
        input_stream_id: StreamId,
        criteria: &str,
        mode: FilterMode,
        model: Option<String>,
    ) -> Result<Stream> {
        let config = TransformConfig::LlmSemanticFilter(SemanticFilterConfig {
            input_stream_id: Some(input_stream_id),
            model,
            criteria: criteria.to_string(),
            mode,
        });
        self.create_transform(name, config, None)
    }
}

fn new_stream(name: &str, description: Option<String>, kind: StreamKind) -> Stream {
    let stream = Stream {
        id: StreamId::generate(),
        name: name.trim().to_string(),
        description,
        status: StreamStatus::Active,
        last_fetched_at: None,
        error_message: None,
        kind,
    };
    tracing::debug!(id = %stream.id, kind = stream.type_name(), "Stream created");
    stream
}

fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RivuletError::invalid_config(kind, "name must not be empty"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Configuration checks
// ---------------------------------------------------------------------------

/// Check a source configuration's required parameters.
pub fn validate_source_config(config: &SourceConfig) -> Result<()> {
    let kind = config.tag();
    match config {
        SourceConfig::Rss(c) => {
            if c.feed_url.trim().is_empty() {
                return Err(RivuletError::invalid_config(kind, "feed_url must not be empty"));
            }
            if c.max_items == 0 {
                return Err(RivuletError::invalid_config(kind, "max_items must be positive"));
            }
            if c.refresh_interval_minutes == 0 {
                return Err(RivuletError::invalid_config(
                    kind,
                    "refresh_interval_minutes must be positive",
                ));
            }
        }
        SourceConfig::YouTube(c) => {
            let has_selector = [&c.channel_id, &c.playlist_id, &c.search_query]
                .iter()
                .any(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()));
            if !has_selector {
                return Err(RivuletError::invalid_config(
                    kind,
                    "one of channel_id, playlist_id or search_query is required",
                ));
            }
            if c.max_results == Some(0) {
                return Err(RivuletError::invalid_config(kind, "max_results must be positive"));
            }
        }
        SourceConfig::Todoist(_) => {}
    }
    Ok(())
}

/// Check a transform configuration's required parameters.
///
/// Inputs are not checked against any registry here; dangling inputs are a
/// validation finding, not a construction error.
pub fn validate_transform_config(config: &TransformConfig) -> Result<()> {
    let kind = config.tag();
    match config {
        TransformConfig::Mixer(c) => {
            for (i, id) in c.input_stream_ids.iter().enumerate() {
                if c.input_stream_ids[..i].contains(id) {
                    return Err(RivuletError::invalid_config(
                        kind,
                        format!("input '{id}' is listed more than once"),
                    ));
                }
            }
            if let Some(weights) = &c.weights {
                if let Some((id, w)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
                    return Err(RivuletError::invalid_config(
                        kind,
                        format!("weight for '{id}' must be a non-negative number, got {w}"),
                    ));
                }
            }
        }
        TransformConfig::Filter(c) => {
            for rule in &c.rules {
                if rule.operator == FilterOperator::MatchesRegex {
                    regex::Regex::new(&rule.value).map_err(|e| {
                        RivuletError::invalid_config(
                            kind,
                            format!("invalid pattern '{}': {e}", rule.value),
                        )
                    })?;
                }
            }
        }
        TransformConfig::Sorter(_) => {}
        TransformConfig::Limiter(c) => {
            if c.max_items == 0 {
                return Err(RivuletError::invalid_config(kind, "max_items must be positive"));
            }
        }
        TransformConfig::LlmSummarizer(c) => {
            if c.max_length == Some(0) {
                return Err(RivuletError::invalid_config(kind, "max_length must be positive"));
            }
        }
        TransformConfig::LlmTagger(c) => {
            if c.max_tags == Some(0) {
                return Err(RivuletError::invalid_config(kind, "max_tags must be positive"));
            }
        }
        TransformConfig::LlmRelevanceScorer(c) => {
            if c.interests.iter().all(|i| i.trim().is_empty()) {
                return Err(RivuletError::invalid_config(kind, "at least one interest is required"));
            }
            if let Some(t) = c.threshold {
                if !(0.0..=1.0).contains(&t) {
                    return Err(RivuletError::invalid_config(
                        kind,
                        format!("threshold must be between 0 and 1, got {t}"),
                    ));
                }
            }
        }
        TransformConfig::LlmSemanticFilter(c) => {
            if c.criteria.trim().is_empty() {
                return Err(RivuletError::invalid_config(kind, "criteria must not be empty"));
            }
        }
    }
    Ok(())
}

/// Check whichever configuration a stream kind carries.
pub fn validate_stream_config(kind: &StreamKind) -> Result<()> {
    match kind {
        StreamKind::Source(c) => validate_source_config(c),
        StreamKind::Transform(c) => validate_transform_config(c),
    }
}

// ---------------------------------------------------------------------------
// Edge mutations
// ---------------------------------------------------------------------------

/// Connect `source` → `target` and record `source` as an input of `target`.
///
/// Idempotent: an existing edge with the same pair is left alone and nothing
/// is recorded twice. Returns `true` if an edge was inserted.
///
/// Input policy: a mixer appends `source` to its inputs. Every other
/// transform kind has exactly one input slot, which is **replaced**, so the
/// most recently added edge into a single-input transform determines its
/// recorded input. The previous producer's edge stays in the graph until
/// removed; removing it later does not touch the recorded input.
pub fn add_edge(
    registry: &mut StreamRegistry,
    graph: &mut StreamGraph,
    source: &StreamId,
    target: &StreamId,
) -> bool {
    if !graph.insert_edge(DagEdge::new(source.clone(), target.clone())) {
        tracing::debug!(%source, %target, "Edge already present");
        return false;
    }
    if let Some(config) = registry.get_mut(target).and_then(Stream::transform_config_mut) {
        config.attach_input(source.clone());
    }
    tracing::debug!(%source, %target, "Edge added");
    true
}

/// Disconnect `source` → `target` and forget `source` as an input of
/// `target`. Returns `true` if an edge was removed.
///
/// Without an edge this is a no-op: declared inputs that were never wired
/// (e.g. a mixer input registered later) are left in place.
pub fn remove_edge(
    registry: &mut StreamRegistry,
    graph: &mut StreamGraph,
    source: &StreamId,
    target: &StreamId,
) -> bool {
    if graph.take_edge(source, target).is_none() {
        return false;
    }
    if let Some(config) = registry.get_mut(target).and_then(Stream::transform_config_mut) {
        config.detach_input(source);
    }
    tracing::debug!(%source, %target, "Edge removed");
    true
}
