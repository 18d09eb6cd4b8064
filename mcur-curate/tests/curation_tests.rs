//! End-to-end curation tests
//!
//! Each test resolves a configuration against the built-in registry and runs
//! sequences through the pipeline or a batch pool.

use mcur_common::Note;
use mcur_curate::config::CurationConfig;
use mcur_curate::metadata::ManualVocabulary;
use mcur_curate::pipeline::{CurationOutcome, CurationPool};
use mcur_curate::{
    resolve_builtin, run_batch, run_batch_records, CurationInput, CurationPipeline, ExecutionPlan, GateMode,
    SourceContext,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

fn plan(config: serde_json::Value) -> Arc<ExecutionPlan> {
    let config = CurationConfig::from_value(config).unwrap();
    Arc::new(resolve_builtin(&config).unwrap())
}

fn pipeline(config: serde_json::Value) -> CurationPipeline {
    CurationPipeline::new(plan(config))
}

/// Pitch 60 every 0.1 s for 5 s
fn repeated_middle_c() -> CurationInput {
    CurationInput::new((0..50).map(|i| Note::new(60, i as f64 * 0.1, 0.1, 80, 0)).collect())
}

// ============================================================================
// Quality gate
// ============================================================================

#[test]
fn test_dense_repeated_pitch_rejected() {
    let p = pipeline(json!({
        "tests": {"note_density_in_interval": {"run": true, "args": {
            "max_notes_per_second": 30, "max_notes_per_second_per_pitch": 6, "interval_len_s": 45
        }}}
    }));
    let result = p.curate(repeated_middle_c()).unwrap();
    assert!(!result.admitted);
    assert_eq!(result.verdicts.len(), 1);
    assert_eq!(result.verdicts[0].rule, "note_density_in_interval");
    assert!(!result.verdicts[0].passed);
}

#[test]
fn test_any_failing_profile_rejects() {
    let p = pipeline(json!({
        "tests": {"note_density_in_interval": {"run": true, "args": {"test_params_list": [
            {"max_notes_per_second": 100, "max_notes_per_second_per_pitch": 100, "interval_len_s": 1},
            {"max_notes_per_second": 30, "max_notes_per_second_per_pitch": 6, "interval_len_s": 45},
        ]}}}
    }));
    let result = p.curate(repeated_middle_c()).unwrap();
    assert!(!result.admitted);
    let outcomes: Vec<(&str, bool)> = result
        .verdicts
        .iter()
        .map(|v| (v.rule.as_str(), v.passed))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("note_density_in_interval#1", true),
            ("note_density_in_interval#2", false)
        ]
    );
}

#[test]
fn test_trailing_silence_rejected() {
    let p = pipeline(json!({
        "tests": {"silent_interval": {"run": true, "args": {"max_silence_s": 20}}}
    }));
    let notes = (0..20).map(|i| Note::new(64, i as f64 * 0.2, 0.2, 80, 0)).collect();
    let result = p.curate(CurationInput::new(notes).with_end_time(25.0)).unwrap();
    assert!(!result.admitted);
    assert!(result.verdicts[0].detail["longest_gap_s"].as_f64().unwrap() > 20.0);
}

#[test]
fn test_no_enabled_tests_admits() {
    let p = pipeline(json!({
        "tests": {
            "silent_interval": {"run": false, "args": {"max_silence_s": 1}},
            "min_length": {"run": false, "args": {"min_seconds": 600}}
        }
    }));
    let result = p
        .curate(CurationInput::new(vec![Note::new(60, 0.0, 0.5, 80, 0)]).with_end_time(100.0))
        .unwrap();
    assert!(result.admitted);
    assert!(result.verdicts.is_empty());
}

#[test]
fn test_undefined_statistic_is_failing_verdict() {
    let p = pipeline(json!({
        "tests": {
            "mean_note_velocity": {"run": true, "args": {"min_mean_velocity": 0, "max_mean_velocity": 127}},
            "min_length": {"run": true, "args": {"min_seconds": 0}}
        }
    }));
    let result = p.curate(CurationInput::default()).unwrap();
    assert!(!result.admitted);
    assert!(result.verdicts[0].detail["error"].is_string());
    assert!(result.verdicts[1].passed);
}

// ============================================================================
// Transform and metadata
// ============================================================================

#[test]
fn test_percussion_removed() {
    let p = pipeline(json!({
        "pre_processing": {"remove_instruments": {"run": true, "args": {"percussive": true}}}
    }));
    let result = p
        .curate(CurationInput::new(vec![
            Note::new(60, 0.0, 1.0, 80, 0),
            Note::drum(36, 0.0, 0.1, 100),
            Note::new(64, 1.0, 1.0, 80, 2),
            Note::drum(42, 0.5, 0.1, 90),
        ]))
        .unwrap();
    assert_eq!(result.sequence.len(), 2);
    assert_eq!(
        result.sequence.instrument_classes().into_iter().collect::<Vec<_>>(),
        vec![mcur_common::InstrumentClass::Piano]
    );
}

#[test]
fn test_transform_idempotent_through_pipeline() {
    let p = pipeline(json!({
        "pre_processing": {"remove_instruments": {"run": true, "args": {"percussive": true, "bass": true}}}
    }));
    let input = CurationInput::new(vec![
        Note::new(60, 0.0, 1.0, 80, 0),
        Note::new(36, 0.0, 1.0, 80, 34),
        Note::drum(36, 0.0, 0.1, 100),
    ]);
    let once = p.curate(input).unwrap().sequence;
    let twice = p.curate_sequence(once.clone(), &SourceContext::default()).sequence;
    assert_eq!(once, twice);
}

#[test]
fn test_composer_from_file_name() {
    let p = pipeline(json!({
        "metadata": {"functions": {"composer_filename": {"run": true, "args": {"composer_names": ["bach", "mozart"]}}}}
    }));
    let notes = vec![Note::new(60, 0.0, 1.0, 80, 0)];

    let bach = p
        .curate(CurationInput::new(notes.clone()).with_context(SourceContext::from_path("Bach_Prelude_No1.mid")))
        .unwrap();
    assert_eq!(bach.tags["composer"], BTreeSet::from(["bach".to_string()]));

    let unknown = p
        .curate(CurationInput::new(notes).with_context(SourceContext::from_path("Unknown_Track.mid")))
        .unwrap();
    assert!(!unknown.tags.contains_key("composer"));
}

#[test]
fn test_manual_tags_checked_against_vocabulary() {
    let p = pipeline(json!({
        "metadata": {"manual": {"music_period": ["baroque", "romantic"]}}
    }));
    let mut result = p.curate(CurationInput::default()).unwrap();
    let vocabulary: &ManualVocabulary = &p.plan().vocabulary;

    vocabulary.apply(&mut result.tags, "music_period", "Baroque").unwrap();
    assert!(vocabulary.apply(&mut result.tags, "music_period", "grunge").is_err());
    assert!(vocabulary.apply(&mut result.tags, "mood", "calm").is_err());
    assert_eq!(
        result.tags,
        BTreeMap::from([("music_period".to_string(), BTreeSet::from(["baroque".to_string()]))])
    );
}

// ============================================================================
// Batches
// ============================================================================

fn mixed_batch() -> Vec<CurationInput> {
    vec![
        // admitted
        CurationInput::new((0..10).map(|i| Note::new(60 + i, i as f64, 1.0, 80, 0)).collect()),
        // rejected: too short
        CurationInput::new(vec![Note::new(60, 0.0, 1.0, 80, 0)]),
        // excluded: velocity out of range
        CurationInput::new(vec![Note::new(60, 0.0, 1.0, 200, 0)]),
        // admitted
        CurationInput::new((0..12).map(|i| Note::new(50 + i, i as f64, 1.0, 80, 0)).collect()),
    ]
}

fn length_plan() -> serde_json::Value {
    json!({"tests": {"min_length": {"run": true, "args": {"min_seconds": 5}}}})
}

#[test]
fn test_batch_stats_and_order() {
    let report = run_batch(pipeline(length_plan()), mixed_batch(), 3);
    assert_eq!(report.stats.admitted, 2);
    assert_eq!(report.stats.rejected, 1);
    assert_eq!(report.stats.excluded, 1);
    assert_eq!(report.stats.cancelled, 0);
    assert_eq!(report.exclusions[0].index, 2);

    let order: Vec<(usize, bool)> = report
        .into_ordered()
        .into_iter()
        .map(|(i, r)| (i, r.admitted))
        .collect();
    assert_eq!(order, vec![(0, true), (1, false), (3, true)]);
}

#[test]
fn test_batch_matches_sequential_results() {
    let p = pipeline(length_plan());
    let sequential: Vec<bool> = mixed_batch()
        .into_iter()
        .filter_map(|input| p.curate(input).ok())
        .map(|r| r.admitted)
        .collect();

    let parallel: Vec<bool> = run_batch(p, mixed_batch(), 4)
        .into_ordered()
        .into_iter()
        .map(|(_, r)| r.admitted)
        .collect();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_undecodable_record_excluded_from_batch() {
    let note = |pitch: u32, onset: f64| {
        json!({"pitch": pitch, "onset": onset, "duration": 1.0, "velocity": 80, "program": 0})
    };
    let records = vec![
        json!({"notes": (0..10).map(|i| note(60, i as f64)).collect::<Vec<_>>()}),
        // pitch does not fit a MIDI data byte
        json!({"notes": [note(300, 0.0)]}),
        json!({"notes": [note(62, 0.0)]}),
    ];

    let report = run_batch_records(pipeline(length_plan()), records, 2);
    assert_eq!(report.stats.admitted, 1);
    assert_eq!(report.stats.rejected, 1);
    assert_eq!(report.stats.excluded, 1);
    assert_eq!(report.stats.total(), 3);
    assert_eq!(report.exclusions[0].index, 1);
    assert!(report.exclusions[0].error.contains("Malformed record"));

    let order: Vec<(usize, bool)> = report
        .into_ordered()
        .into_iter()
        .map(|(i, r)| (i, r.admitted))
        .collect();
    assert_eq!(order, vec![(0, true), (2, false)]);
}

#[test]
fn test_cancelled_batch_still_reports() {
    let mut pool = CurationPool::new(pipeline(length_plan()), 2);
    pool.cancel();
    pool.submit_all(mixed_batch());
    let report = mcur_curate::pipeline::BatchReport::from_summary(chrono::Utc::now(), pool.finish());
    assert_eq!(report.stats.cancelled, 4);
    assert_eq!(report.stats.total(), 4);
    assert!(report.results.is_empty());
}

#[test]
fn test_fail_fast_batch() {
    let p = pipeline(json!({
        "tests": {
            "min_length": {"run": true, "args": {"min_seconds": 100}},
            "max_programs": {"run": true, "args": {"max": 1}},
        }
    }))
    .with_mode(GateMode::FailFast);
    let mut pool = CurationPool::new(p, 2);
    pool.submit(CurationInput::new(vec![Note::new(60, 0.0, 1.0, 80, 0)]));
    let summary = pool.finish();
    match &summary.outcomes[0] {
        CurationOutcome::Curated { result, .. } => {
            assert!(!result.admitted);
            assert_eq!(result.verdicts.len(), 1);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}
