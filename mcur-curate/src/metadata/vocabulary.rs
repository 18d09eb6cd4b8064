//! Manual tag vocabulary
//!
//! The `metadata.manual` block declares, per category, the closed set of
//! values an operator may attach by hand. It is never executed. Values are
//! compared in lower case, the same form the automatic extractors emit.

use crate::error::{ConfigError, ConfigResult, TagError};
use crate::types::{MetadataRule, Tags};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder reported when an open-ended extractor meets a closed category
const OPEN_ENDED_VALUE: &str = "<any value>";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManualVocabulary {
    categories: BTreeMap<String, BTreeSet<String>>,
}

impl ManualVocabulary {
    pub fn new(manual: &BTreeMap<String, Vec<String>>) -> Self {
        let categories = manual
            .iter()
            .map(|(category, values)| {
                let values = values
                    .iter()
                    .map(|v| v.trim().to_lowercase())
                    .filter(|v| !v.is_empty())
                    .collect();
                (category.clone(), values)
            })
            .collect();
        Self { categories }
    }

    /// Number of declared categories
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Allowed values for a category
    pub fn values(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.categories.get(category)
    }

    /// Check one operator tag
    pub fn validate(&self, category: &str, value: &str) -> Result<(), TagError> {
        let allowed = self
            .categories
            .get(category)
            .ok_or_else(|| TagError::UnknownCategory(category.to_string()))?;
        if !allowed.contains(&value.trim().to_lowercase()) {
            return Err(TagError::UnknownValue {
                category: category.to_string(),
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Validate and attach one operator tag
    pub fn apply(&self, tags: &mut Tags, category: &str, value: &str) -> Result<(), TagError> {
        self.validate(category, value)?;
        tags.entry(category.to_string())
            .or_default()
            .insert(value.trim().to_lowercase());
        Ok(())
    }

    /// Fail if `extractor` can emit a value its category does not allow
    ///
    /// Categories without a manual declaration are unconstrained. An
    /// open-ended extractor writing a declared category always fails.
    pub(crate) fn check_extractor(&self, rule: &str, extractor: &dyn MetadataRule) -> ConfigResult<()> {
        let category = extractor.category();
        let Some(allowed) = self.categories.get(category) else {
            return Ok(());
        };

        let mismatch = |value: &str| ConfigError::VocabularyMismatch {
            rule: rule.to_string(),
            category: category.to_string(),
            value: value.to_string(),
        };

        match extractor.vocabulary() {
            None => Err(mismatch(OPEN_ENDED_VALUE)),
            Some(values) => match values.iter().find(|v| !allowed.contains(*v)) {
                Some(value) => Err(mismatch(value.as_str())),
                None => Ok(()),
            },
        }
    }
}
