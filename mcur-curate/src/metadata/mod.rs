//! Metadata stage
//!
//! Runs the plan's extractors against the post-transform sequence and its
//! source context. Each extractor owns one category (enforced at resolution),
//! so results are simply collected by category. Categories with no match are
//! left out of the tag map.

pub mod matchers;
pub mod vocabulary;

use crate::config::plan::PlanEntry;
use crate::types::{MetadataRule, SourceContext, Tags};
use mcur_common::Sequence;
use tracing::trace;

pub use matchers::{builtin_rules, AbsPath, NameMatcher, TextSource};
pub use vocabulary::ManualVocabulary;

/// Run every extractor and collect non-empty categories
pub fn extract(
    sequence: &Sequence,
    extractors: &[PlanEntry<dyn MetadataRule>],
    context: &SourceContext,
) -> Tags {
    let mut tags = Tags::new();
    for entry in extractors {
        let values = entry.runner.extract(sequence, context);
        trace!(rule = %entry.id, matches = values.len(), "Extracted metadata");
        if !values.is_empty() {
            tags.entry(entry.runner.category().to_string())
                .or_default()
                .extend(values);
        }
    }
    tags
}
