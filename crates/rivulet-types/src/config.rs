//! Per-kind configuration for sources and transforms.
//!
//! Both [`SourceConfig`] and [`TransformConfig`] are closed sets tagged by a
//! `type` field when serialized. [`TransformConfig::input_ids`] is the only
//! place that knows where each transform kind records its inputs; the graph
//! engine goes through it (and the matching `attach_input` / `detach_input`
//! mutators) instead of matching on kinds itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::StreamId;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Rss(RssConfig),
    #[serde(rename = "youtube")]
    YouTube(YouTubeConfig),
    Todoist(TodoistConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssConfig {
    pub feed_url: String,
    pub max_items: u32,
    pub refresh_interval_minutes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YouTubeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodoistConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_id: Option<String>,
}

impl SourceConfig {
    /// Serialized `type` tag, also used as the `kind` of construction errors.
    pub fn tag(&self) -> &'static str {
        match self {
            SourceConfig::Rss(_) => "rss",
            SourceConfig::YouTube(_) => "youtube",
            SourceConfig::Todoist(_) => "todoist",
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SourceConfig::Rss(_) => "RSS Feed",
            SourceConfig::YouTube(_) => "YouTube",
            SourceConfig::Todoist(_) => "Todoist",
        }
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformConfig {
    Mixer(MixerConfig),
    Filter(FilterConfig),
    Sorter(SorterConfig),
    Limiter(LimiterConfig),
    LlmSummarizer(SummarizerConfig),
    LlmTagger(TaggerConfig),
    LlmRelevanceScorer(RelevanceScorerConfig),
    LlmSemanticFilter(SemanticFilterConfig),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixStrategy {
    #[default]
    Interleave,
    Weighted,
    RoundRobin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    pub input_stream_ids: Vec<StreamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<BTreeMap<StreamId, f64>>,
    pub strategy: MixStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Title,
    Description,
    Author,
    Content,
    Tag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Contains,
    NotContains,
    Equals,
    MatchesRegex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub field: FilterField,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterRule {
    pub fn new(field: FilterField, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    Include,
    #[default]
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_stream_id: Option<StreamId>,
    pub rules: Vec<FilterRule>,
    pub mode: FilterMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    PublishedAt,
    FetchedAt,
    Title,
    RelevanceScore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SorterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_stream_id: Option<StreamId>,
    pub sort_by: SortKey,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_stream_id: Option<StreamId>,
    pub max_items: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStyle {
    Brief,
    Detailed,
    BulletPoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_stream_id: Option<StreamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<SummaryStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_stream_id: Option<StreamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tags: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceScorerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_stream_id: Option<StreamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticFilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_stream_id: Option<StreamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub criteria: String,
    pub mode: FilterMode,
}

impl TransformConfig {
    /// Input stream ids declared by this transform, in recorded order.
    ///
    /// Mixers return their whole list; every other kind returns zero or one
    /// id depending on whether its single input is currently set.
    pub fn input_ids(&self) -> &[StreamId] {
        match self {
            TransformConfig::Mixer(c) => &c.input_stream_ids,
            _ => match self.single_input() {
                Some(input) => input.as_slice(),
                None => &[],
            },
        }
    }

    /// `true` for kinds that combine several inputs (currently only mixers).
    pub fn accepts_multiple_inputs(&self) -> bool {
        matches!(self, TransformConfig::Mixer(_))
    }

    /// Record `source` as an input.
    ///
    /// Mixers append it (once); single-input kinds replace whatever input was
    /// recorded before, so the most recent producer always wins.
    pub fn attach_input(&mut self, source: StreamId) {
        if let TransformConfig::Mixer(c) = self {
            if !c.input_stream_ids.contains(&source) {
                c.input_stream_ids.push(source);
            }
            return;
        }
        if let Some(slot) = self.single_input_mut() {
            *slot = Some(source);
        }
    }

    /// Forget `source` as an input. Returns `true` if anything changed.
    ///
    /// A single-input transform only clears its input when it still points
    /// at `source`; a replaced producer is no longer recorded and is ignored.
    pub fn detach_input(&mut self, source: &StreamId) -> bool {
        if let TransformConfig::Mixer(c) = self {
            let before = c.input_stream_ids.len();
            c.input_stream_ids.retain(|id| id != source);
            if let Some(weights) = c.weights.as_mut() {
                weights.remove(source);
            }
            return c.input_stream_ids.len() != before;
        }
        match self.single_input_mut() {
            Some(slot) if slot.as_ref() == Some(source) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    fn single_input(&self) -> Option<&Option<StreamId>> {
        match self {
            TransformConfig::Mixer(_) => None,
            TransformConfig::Filter(c) => Some(&c.input_stream_id),
            TransformConfig::Sorter(c) => Some(&c.input_stream_id),
            TransformConfig::Limiter(c) => Some(&c.input_stream_id),
            TransformConfig::LlmSummarizer(c) => Some(&c.input_stream_id),
            TransformConfig::LlmTagger(c) => Some(&c.input_stream_id),
            TransformConfig::LlmRelevanceScorer(c) => Some(&c.input_stream_id),
            TransformConfig::LlmSemanticFilter(c) => Some(&c.input_stream_id),
        }
    }

    fn single_input_mut(&mut self) -> Option<&mut Option<StreamId>> {
        match self {
            TransformConfig::Mixer(_) => None,
            TransformConfig::Filter(c) => Some(&mut c.input_stream_id),
            TransformConfig::Sorter(c) => Some(&mut c.input_stream_id),
            TransformConfig::Limiter(c) => Some(&mut c.input_stream_id),
            TransformConfig::LlmSummarizer(c) => Some(&mut c.input_stream_id),
            TransformConfig::LlmTagger(c) => Some(&mut c.input_stream_id),
            TransformConfig::LlmRelevanceScorer(c) => Some(&mut c.input_stream_id),
            TransformConfig::LlmSemanticFilter(c) => Some(&mut c.input_stream_id),
        }
    }

    /// `true` for the kinds that call out to a language model.
    pub fn is_llm(&self) -> bool {
        matches!(
            self,
            TransformConfig::LlmSummarizer(_)
                | TransformConfig::LlmTagger(_)
                | TransformConfig::LlmRelevanceScorer(_)
                | TransformConfig::LlmSemanticFilter(_)
        )
    }

    /// Serialized `type` tag, also used as the `kind` of construction errors.
    pub fn tag(&self) -> &'static str {
        match self {
            TransformConfig::Mixer(_) => "mixer",
            TransformConfig::Filter(_) => "filter",
            TransformConfig::Sorter(_) => "sorter",
            TransformConfig::Limiter(_) => "limiter",
            TransformConfig::LlmSummarizer(_) => "llm_summarizer",
            TransformConfig::LlmTagger(_) => "llm_tagger",
            TransformConfig::LlmRelevanceScorer(_) => "llm_relevance_scorer",
            TransformConfig::LlmSemanticFilter(_) => "llm_semantic_filter",
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TransformConfig::Mixer(_) => "Mixer",
            TransformConfig::Filter(_) => "Filter",
            TransformConfig::Sorter(_) => "Sorter",
            TransformConfig::Limiter(_) => "Limiter",
            TransformConfig::LlmSummarizer(_) => "AI Summarizer",
            TransformConfig::LlmTagger(_) => "AI Tagger",
            TransformConfig::LlmRelevanceScorer(_) => "AI Relevance Scorer",
            TransformConfig::LlmSemanticFilter(_) => "AI Semantic Filter",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<StreamId> {
        raw.iter().map(|&id| StreamId::from(id)).collect()
    }

    fn mixer(inputs: &[&str]) -> TransformConfig {
        TransformConfig::Mixer(MixerConfig {
            input_stream_ids: ids(inputs),
            weights: None,
            strategy: MixStrategy::Interleave,
        })
    }

    fn limiter(input: Option<&str>) -> TransformConfig {
        TransformConfig::Limiter(LimiterConfig {
            input_stream_id: input.map(StreamId::from),
            max_items: 10,
        })
    }

    #[test]
    fn input_ids_covers_every_shape() {
        assert_eq!(mixer(&["a", "b"]).input_ids(), ids(&["a", "b"]).as_slice());
        assert!(mixer(&[]).input_ids().is_empty());
        assert_eq!(limiter(Some("a")).input_ids(), ids(&["a"]).as_slice());
        assert!(limiter(None).input_ids().is_empty());
    }

    #[test]
    fn attach_appends_to_mixer_once() {
        let mut cfg = mixer(&["a"]);
        cfg.attach_input("b".into());
        cfg.attach_input("b".into());
        assert_eq!(cfg.input_ids().len(), 2);
    }

    #[test]
    fn attach_replaces_single_input() {
        let mut cfg = limiter(Some("a"));
        cfg.attach_input("b".into());
        assert_eq!(cfg.input_ids(), ids(&["b"]).as_slice());
    }

    #[test]
    fn detach_ignores_replaced_producer() {
        let mut cfg = limiter(Some("b"));
        assert!(!cfg.detach_input(&"a".into()));
        assert_eq!(cfg.input_ids(), ids(&["b"]).as_slice());
        assert!(cfg.detach_input(&"b".into()));
        assert!(cfg.input_ids().is_empty());
    }

    #[test]
    fn detach_drops_mixer_weight() {
        let mut weights = BTreeMap::new();
        weights.insert(StreamId::from("a"), 2.0);
        weights.insert(StreamId::from("b"), 1.0);
        let mut cfg = TransformConfig::Mixer(MixerConfig {
            input_stream_ids: vec!["a".into(), "b".into()],
            weights: Some(weights),
            strategy: MixStrategy::Weighted,
        });
        assert!(cfg.detach_input(&"a".into()));
        match cfg {
            TransformConfig::Mixer(c) => {
                assert_eq!(c.input_stream_ids, vec![StreamId::from("b")]);
                assert!(!c.weights.unwrap().contains_key("a"));
            }
            other => panic!("expected mixer, got {other:?}"),
        }
    }

    #[test]
    fn llm_kinds_are_flagged() {
        let summarizer = TransformConfig::LlmSummarizer(SummarizerConfig {
            input_stream_id: None,
            model: None,
            max_length: None,
            style: Some(SummaryStyle::Brief),
        });
        assert!(summarizer.is_llm());
        assert!(!mixer(&[]).is_llm());
        assert_eq!(summarizer.type_name(), "AI Summarizer");
    }

    #[test]
    fn transform_config_is_tagged_by_type() {
        let json = serde_json::to_value(limiter(Some("feed"))).unwrap();
        assert_eq!(json["type"], "limiter");
        assert_eq!(json["input_stream_id"], "feed");
        assert_eq!(json["max_items"], 10);

        let source = SourceConfig::YouTube(YouTubeConfig {
            channel_id: Some("UC123".into()),
            ..Default::default()
        });
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["type"], "youtube");
        assert!(json.get("playlist_id").is_none());
    }
}
