//! mcur-curate library interface
//!
//! Rule-driven curation engine for symbolic-music corpora:
//! - [`registry`]: built-in rules by name and kind, with parameter schemas
//! - [`config`]: declarative configuration and its resolution into an
//!   [`ExecutionPlan`](config::ExecutionPlan)
//! - [`gate`]: quality-gate test rules and admission
//! - [`transform`]: pre-processing rules
//! - [`metadata`]: tag extractors and the manual vocabulary
//! - [`pipeline`]: per-sequence curation, worker pool, batch report

pub mod config;
pub mod error;
pub mod gate;
pub mod metadata;
pub mod pipeline;
pub mod registry;
pub mod transform;
pub mod types;

pub use crate::config::{resolve, resolve_builtin, CurationConfig, ExecutionPlan};
pub use crate::error::{ConfigError, ConfigResult, RegistryError, RuleError, TagError};
pub use crate::gate::GateMode;
pub use crate::pipeline::{run_batch, run_batch_records, BatchReport, CurationInput, CurationPipeline, CurationPool};
pub use crate::registry::{RuleKind, RuleRegistry, BUILTIN_REGISTRY};
pub use crate::types::{CurationResult, SourceContext, Tags, Verdict};
