//! Batch report
//!
//! Summary of one batch run: every curated result, every excluded input,
//! and the counts by disposition. A batch always produces a report, even
//! when it is cancelled part-way.

use super::pool::{CurationOutcome, CurationPool, PoolSummary};
use super::{CurationInput, CurationPipeline};
use crate::types::CurationResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// Counts by disposition; they sum to the number of inputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub admitted: usize,
    pub rejected: usize,
    /// Inputs that failed data-integrity validation
    pub excluded: usize,
    /// Inputs never processed because the batch was cancelled
    pub cancelled: usize,
}

impl BatchStats {
    pub fn total(&self) -> usize {
        self.admitted + self.rejected + self.excluded + self.cancelled
    }
}

/// An input that was excluded instead of curated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exclusion {
    pub index: usize,
    pub error: String,
}

/// Outcome of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `(input index, result)` in completion order
    pub results: Vec<(usize, CurationResult)>,
    pub exclusions: Vec<Exclusion>,
    /// Indexes of cancelled inputs
    pub cancelled: Vec<usize>,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Assemble a report from a finished pool
    pub fn from_summary(started_at: DateTime<Utc>, summary: PoolSummary) -> Self {
        let mut report = Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            results: Vec::new(),
            exclusions: Vec::new(),
            cancelled: summary.cancelled,
            stats: BatchStats::default(),
        };
        report.stats.cancelled = report.cancelled.len();

        for outcome in summary.outcomes {
            match outcome {
                CurationOutcome::Curated { index, result } => {
                    if result.admitted {
                        report.stats.admitted += 1;
                    } else {
                        report.stats.rejected += 1;
                    }
                    report.results.push((index, result));
                }
                CurationOutcome::Excluded { index, error } => {
                    report.stats.excluded += 1;
                    report.exclusions.push(Exclusion {
                        index,
                        error: error.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Results sorted back into input order
    pub fn into_ordered(mut self) -> Vec<(usize, CurationResult)> {
        self.results.sort_by_key(|(index, _)| *index);
        self.results
    }

    /// Admitted results only, in completion order
    pub fn admitted(&self) -> impl Iterator<Item = &(usize, CurationResult)> {
        self.results.iter().filter(|(_, r)| r.admitted)
    }
}

/// Curate a whole batch on `workers` threads and wait for it
pub fn run_batch<I>(pipeline: CurationPipeline, inputs: I, workers: usize) -> BatchReport
where
    I: IntoIterator<Item = CurationInput>,
{
    run_pool(pipeline, workers, |pool| pool.submit_all(inputs))
}

/// Decode and curate a batch of raw records
///
/// A record that does not decode into a [`CurationInput`] is excluded under
/// its own index; the rest of the batch still runs.
pub fn run_batch_records<I>(pipeline: CurationPipeline, records: I, workers: usize) -> BatchReport
where
    I: IntoIterator<Item = Value>,
{
    run_pool(pipeline, workers, |pool| {
        records
            .into_iter()
            .map(|record| match CurationInput::from_value(record) {
                Ok(input) => pool.submit(input),
                Err(error) => pool.exclude(error),
            })
            .count()
    })
}

fn run_pool<F>(pipeline: CurationPipeline, workers: usize, submit: F) -> BatchReport
where
    F: FnOnce(&mut CurationPool) -> usize,
{
    let started_at = Utc::now();
    let mut pool = CurationPool::new(pipeline, workers);
    let submitted = submit(&mut pool);
    let report = BatchReport::from_summary(started_at, pool.finish());

    info!(
        run_id = %report.run_id,
        submitted,
        admitted = report.stats.admitted,
        rejected = report.stats.rejected,
        excluded = report.stats.excluded,
        cancelled = report.stats.cancelled,
        elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
        "Batch complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verdict;
    use mcur_common::{DataIntegrityError, Sequence};

    fn result(admitted: bool) -> CurationResult {
        CurationResult {
            sequence: Sequence::empty(),
            admitted,
            verdicts: vec![Verdict {
                rule: "min_length".into(),
                passed: admitted,
                detail: Value::Null,
            }],
            tags: Default::default(),
        }
    }

    #[test]
    fn test_from_summary_counts() {
        let summary = PoolSummary {
            outcomes: vec![
                CurationOutcome::Curated {
                    index: 2,
                    result: result(true),
                },
                CurationOutcome::Excluded {
                    index: 1,
                    error: DataIntegrityError::PitchOutOfRange { index: 0, pitch: 200 },
                },
                CurationOutcome::Curated {
                    index: 0,
                    result: result(false),
                },
            ],
            cancelled: vec![3, 4],
        };
        let report = BatchReport::from_summary(Utc::now(), summary);
        assert_eq!(
            report.stats,
            BatchStats {
                admitted: 1,
                rejected: 1,
                excluded: 1,
                cancelled: 2
            }
        );
        assert_eq!(report.stats.total(), 5);
        assert_eq!(report.exclusions[0].index, 1);
        assert!(report.exclusions[0].error.contains("pitch"));
        assert_eq!(report.admitted().count(), 1);
        assert!(report.finished_at >= report.started_at);

        let ordered: Vec<usize> = report.into_ordered().into_iter().map(|(i, _)| i).collect();
        assert_eq!(ordered, vec![0, 2]);
    }

    #[test]
    fn test_report_serializes() {
        let report = BatchReport::from_summary(Utc::now(), PoolSummary::default());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["stats"]["admitted"], 0);
        assert!(value["run_id"].is_string());
    }
}
