//! Rule registry
//!
//! Maps `(kind, name)` to a [`RuleDescriptor`]: the rule's parameter schema
//! and a binder that turns validated args into an executable rule object.
//!
//! The built-in rules live in the process-wide [`BUILTIN_REGISTRY`], which is
//! populated once on first access and never mutated afterwards. Callers that
//! need extra rules clone it (or call [`RuleRegistry::with_builtin_rules`]),
//! register their own descriptors, and resolve configurations against that.

pub mod schema;

use crate::error::RegistryError;
use crate::types::{MetadataRule, TestRule, TransformRule};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub use schema::{ParamInfo, ParamSchema, ParamSpec, ParamType};

/// Process-wide registry of the built-in rules
pub static BUILTIN_REGISTRY: Lazy<RuleRegistry> = Lazy::new(RuleRegistry::with_builtin_rules);

/// Which stage a rule belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Test,
    PreProcessing,
    Metadata,
}

impl RuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Test => "test",
            RuleKind::PreProcessing => "pre_processing",
            RuleKind::Metadata => "metadata",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule bound to concrete arguments, ready to run
#[derive(Debug, Clone)]
pub enum BoundRule {
    Test(Arc<dyn TestRule>),
    Transform(Arc<dyn TransformRule>),
    Metadata(Arc<dyn MetadataRule>),
}

impl BoundRule {
    pub fn kind(&self) -> RuleKind {
        match self {
            BoundRule::Test(_) => RuleKind::Test,
            BoundRule::Transform(_) => RuleKind::PreProcessing,
            BoundRule::Metadata(_) => RuleKind::Metadata,
        }
    }
}

/// Turns schema-validated args into a bound rule
pub type Binder = Arc<dyn Fn(&Value) -> Result<BoundRule, serde_json::Error> + Send + Sync>;

/// Registration record for one rule
#[derive(Clone)]
pub struct RuleDescriptor {
    pub name: String,
    pub kind: RuleKind,
    /// One-line description for listings
    pub summary: &'static str,
    pub schema: ParamSchema,
    binder: Binder,
}

impl RuleDescriptor {
    /// Descriptor with a custom binder
    pub fn new<F>(
        name: impl Into<String>,
        kind: RuleKind,
        summary: &'static str,
        schema: ParamSchema,
        binder: F,
    ) -> Self
    where
        F: Fn(&Value) -> Result<BoundRule, serde_json::Error> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            summary,
            schema,
            binder: Arc::new(binder),
        }
    }

    /// Test rule whose parameter struct deserializes directly from the args
    pub fn test<R>(name: impl Into<String>, summary: &'static str, schema: ParamSchema) -> Self
    where
        R: TestRule + DeserializeOwned + 'static,
    {
        Self::new(name, RuleKind::Test, summary, schema, |args| {
            let rule: R = serde_json::from_value(args_object(args))?;
            Ok(BoundRule::Test(Arc::new(rule)))
        })
    }

    /// Pre-processing rule whose parameter struct deserializes directly from the args
    pub fn transform<R>(name: impl Into<String>, summary: &'static str, schema: ParamSchema) -> Self
    where
        R: TransformRule + DeserializeOwned + 'static,
    {
        Self::new(name, RuleKind::PreProcessing, summary, schema, |args| {
            let rule: R = serde_json::from_value(args_object(args))?;
            Ok(BoundRule::Transform(Arc::new(rule)))
        })
    }

    /// Bind validated args
    pub fn bind(&self, args: &Value) -> Result<BoundRule, serde_json::Error> {
        (self.binder)(args)
    }
}

impl fmt::Debug for RuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// `null` args deserialize as an empty mapping
fn args_object(args: &Value) -> Value {
    match args {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    }
}

/// Rule listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleInfo {
    pub name: String,
    pub kind: RuleKind,
    pub summary: &'static str,
    pub params: Vec<ParamInfo>,
}

/// Name-keyed rule table, one namespace per kind
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<(RuleKind, String), Arc<RuleDescriptor>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in rule
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        let builtins = crate::gate::builtin_rules()
            .into_iter()
            .chain(crate::transform::builtin_rules())
            .chain(crate::metadata::builtin_rules());
        for descriptor in builtins {
            if let Err(e) = registry.register(descriptor) {
                warn!("Skipping built-in rule: {}", e);
            }
        }
        registry
    }

    /// Register a rule
    ///
    /// # Errors
    /// `DuplicateRule` if a rule with the same name is already registered
    /// for the same kind. The same name may be used by different kinds.
    pub fn register(&mut self, descriptor: RuleDescriptor) -> Result<(), RegistryError> {
        let key = (descriptor.kind, descriptor.name.clone());
        if self.rules.contains_key(&key) {
            return Err(RegistryError::DuplicateRule {
                name: descriptor.name,
                kind: descriptor.kind,
            });
        }
        self.rules.insert(key, Arc::new(descriptor));
        Ok(())
    }

    /// Look up a rule by name and kind
    pub fn resolve(&self, name: &str, kind: RuleKind) -> Result<Arc<RuleDescriptor>, RegistryError> {
        self.rules
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownRule {
                name: name.to_string(),
                kind,
            })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Names registered for one kind, sorted
    pub fn names(&self, kind: RuleKind) -> Vec<&str> {
        self.rules
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Every rule with its parameter schema, ordered by kind then name
    pub fn describe(&self) -> Vec<RuleInfo> {
        self.rules
            .values()
            .map(|d| RuleInfo {
                name: d.name.clone(),
                kind: d.kind,
                summary: d.summary,
                params: d.schema.describe(),
            })
            .collect()
    }
}
