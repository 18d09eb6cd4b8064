//! Built-in metadata extractors
//!
//! Name matchers test a configured list of names against one piece of
//! external text (file name, embedded text messages, or a dataset record
//! field). Matching is a case-insensitive substring test; every matching
//! name becomes a tag value, emitted in lower case.

use crate::registry::{BoundRule, ParamSchema, ParamSpec, ParamType, RuleDescriptor, RuleKind};
use crate::types::{MetadataRule, SourceContext};
use mcur_common::Sequence;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Dataset record field holding the composer name
pub const MAESTRO_COMPOSER_FIELD: &str = "canonical_composer";

/// External text a matcher searches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    FileName,
    TextMessages,
    DatasetField(&'static str),
}

impl TextSource {
    /// Lower-cased texts to search
    fn texts(&self, context: &SourceContext) -> Vec<String> {
        let raw: Vec<String> = match self {
            TextSource::FileName => context.file_name().into_iter().collect(),
            TextSource::TextMessages => context.text_messages.clone(),
            TextSource::DatasetField(field) => {
                context.dataset_fields.get(*field).cloned().into_iter().collect()
            }
        };
        raw.iter().map(|t| t.to_lowercase()).collect()
    }
}

/// Substring matcher over a fixed name list
#[derive(Debug, Clone)]
pub struct NameMatcher {
    category: String,
    source: TextSource,
    /// Lower-cased, deduplicated, in configured order
    names: Vec<String>,
}

impl NameMatcher {
    pub fn new(category: impl Into<String>, source: TextSource, names: &[String]) -> Self {
        let mut seen = BTreeSet::new();
        let names = names
            .iter()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty() && seen.insert(n.clone()))
            .collect();
        Self {
            category: category.into(),
            source,
            names,
        }
    }
}

impl MetadataRule for NameMatcher {
    fn category(&self) -> &str {
        &self.category
    }

    fn vocabulary(&self) -> Option<BTreeSet<String>> {
        Some(self.names.iter().cloned().collect())
    }

    fn extract(&self, _sequence: &Sequence, context: &SourceContext) -> BTreeSet<String> {
        let texts = self.source.texts(context);
        self.names
            .iter()
            .filter(|name| texts.iter().any(|text| text.contains(name.as_str())))
            .cloned()
            .collect()
    }
}

/// Tags a sequence with its full source path
#[derive(Debug, Clone, Default)]
pub struct AbsPath;

impl AbsPath {
    pub const CATEGORY: &'static str = "abs_path";
}

impl MetadataRule for AbsPath {
    fn category(&self) -> &str {
        Self::CATEGORY
    }

    fn vocabulary(&self) -> Option<BTreeSet<String>> {
        None
    }

    fn extract(&self, _sequence: &Sequence, context: &SourceContext) -> BTreeSet<String> {
        context
            .path
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }
}

/// Descriptor for a name matcher reading its list from args key `key`
fn name_matcher(
    rule: &'static str,
    category: &'static str,
    key: &'static str,
    source: TextSource,
    summary: &'static str,
) -> RuleDescriptor {
    let schema = ParamSchema::new(vec![ParamSpec::required(
        key,
        ParamType::NameList,
        "Names to look for (case-insensitive substring match)",
    )]);

    RuleDescriptor::new(rule, RuleKind::Metadata, summary, schema, move |args| {
        let mut lists: BTreeMap<String, Vec<String>> = match args {
            Value::Null => BTreeMap::new(),
            other => serde_json::from_value(other.clone())?,
        };
        let names = lists.remove(key).unwrap_or_default();
        Ok(BoundRule::Metadata(Arc::new(NameMatcher::new(
            category,
            source.clone(),
            &names,
        ))))
    })
}

/// Descriptors for every built-in extractor
pub fn builtin_rules() -> Vec<RuleDescriptor> {
    vec![
        name_matcher(
            "composer_filename",
            "composer",
            "composer_names",
            TextSource::FileName,
            "Composer names found in the file name",
        ),
        name_matcher(
            "composer_msg",
            "composer",
            "composer_names",
            TextSource::TextMessages,
            "Composer names found in embedded text messages",
        ),
        name_matcher(
            "form_filename",
            "form",
            "form_names",
            TextSource::FileName,
            "Musical forms found in the file name",
        ),
        name_matcher(
            "form_msg",
            "form",
            "form_names",
            TextSource::TextMessages,
            "Musical forms found in embedded text messages",
        ),
        name_matcher(
            "genre_filename",
            "genre",
            "genre_names",
            TextSource::FileName,
            "Genres found in the file name",
        ),
        name_matcher(
            "genre_msg",
            "genre",
            "genre_names",
            TextSource::TextMessages,
            "Genres found in embedded text messages",
        ),
        name_matcher(
            "maestro_json",
            "composer",
            "composer_names",
            TextSource::DatasetField(MAESTRO_COMPOSER_FIELD),
            "Composer names found in the dataset record's canonical composer",
        ),
        RuleDescriptor::new(
            "abs_path",
            RuleKind::Metadata,
            "Full source path",
            ParamSchema::empty(),
            |_| Ok(BoundRule::Metadata(Arc::new(AbsPath))),
        ),
    ]
}
