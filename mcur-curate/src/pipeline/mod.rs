//! Curation pipeline
//!
//! One invocation per input sequence: build the sequence (validating it),
//! then Transform → Quality Gate → Metadata against a shared, immutable
//! execution plan. Invocations share nothing mutable and may run on any
//! number of threads; see [`pool`] for the batch worker pool.

pub mod pool;
pub mod report;

use crate::config::ExecutionPlan;
use crate::gate::{self, GateMode};
use crate::metadata;
use crate::transform;
use crate::types::{CurationResult, SourceContext};
use mcur_common::{DataIntegrityError, Note, Sequence};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub use pool::{CancelHandle, CurationOutcome, CurationPool, PoolSummary};
pub use report::{run_batch, run_batch_records, BatchReport, BatchStats, Exclusion};

/// One raw sequence as delivered by the parsing collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurationInput {
    pub notes: Vec<Note>,
    /// Explicit end time; derived from the latest note-off when absent
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub context: SourceContext,
}

impl CurationInput {
    pub fn new(notes: Vec<Note>) -> Self {
        Self {
            notes,
            ..Self::default()
        }
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_context(mut self, context: SourceContext) -> Self {
        self.context = context;
        self
    }

    /// Decode one input record
    ///
    /// # Errors
    /// `MalformedRecord` with the decoder's message when the record does not
    /// have the input shape or a field is out of its type's range.
    pub fn from_value(record: Value) -> Result<Self, DataIntegrityError> {
        serde_json::from_value(record).map_err(|e| DataIntegrityError::MalformedRecord(e.to_string()))
    }

    /// Validate and order the notes
    pub fn into_sequence(self) -> Result<(Sequence, SourceContext), DataIntegrityError> {
        let sequence = match self.end_time {
            Some(end) => Sequence::with_end_time(self.notes, end)?,
            None => Sequence::new(self.notes)?,
        };
        Ok((sequence, self.context))
    }
}

/// Applies an execution plan to individual sequences
#[derive(Debug, Clone)]
pub struct CurationPipeline {
    plan: Arc<ExecutionPlan>,
    mode: GateMode,
}

impl CurationPipeline {
    pub fn new(plan: Arc<ExecutionPlan>) -> Self {
        Self {
            plan,
            mode: GateMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: GateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn plan(&self) -> &Arc<ExecutionPlan> {
        &self.plan
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    /// Curate one raw input
    ///
    /// # Errors
    /// `DataIntegrityError` if the notes do not form a valid sequence; the
    /// caller excludes the input rather than rejecting it.
    pub fn curate(&self, input: CurationInput) -> Result<CurationResult, DataIntegrityError> {
        let (sequence, context) = input.into_sequence()?;
        Ok(self.curate_sequence(sequence, &context))
    }

    /// Curate an already-validated sequence
    pub fn curate_sequence(&self, sequence: Sequence, context: &SourceContext) -> CurationResult {
        let sequence = transform::apply(sequence, &self.plan.pre_processing);
        let gate = gate::evaluate(&sequence, &self.plan.tests, self.mode);
        let tags = metadata::extract(&sequence, &self.plan.metadata, context);

        debug!(
            notes = sequence.len(),
            admitted = gate.admitted,
            failed = gate.verdicts.iter().filter(|v| !v.passed).count(),
            "Curated sequence"
        );

        CurationResult {
            sequence,
            admitted: gate.admitted,
            verdicts: gate.verdicts,
            tags,
        }
    }
}
