//! Sequence model integration tests

use mcur_common::{DataIntegrityError, InstrumentClass, Note, Sequence};

fn ensemble() -> Sequence {
    Sequence::with_end_time(
        vec![
            Note::new(67, 2.0, 1.0, 70, 40),
            Note::new(60, 0.0, 1.0, 80, 0),
            Note::drum(36, 0.0, 0.1, 100),
            Note::new(36, 1.0, 2.0, 90, 33),
            Note::new(64, 4.0, 1.0, 75, 0),
        ],
        10.0,
    )
    .unwrap()
}

#[test]
fn test_notes_sorted_and_end_time_kept() {
    let s = ensemble();
    let onsets: Vec<f64> = s.notes().iter().map(|n| n.onset).collect();
    assert_eq!(onsets, vec![0.0, 0.0, 1.0, 2.0, 4.0]);
    // equal onsets keep input order
    assert_eq!(s.notes()[0].pitch, 60);
    assert_eq!(s.duration(), 10.0);
}

#[test]
fn test_instrument_queries() {
    let s = ensemble();
    assert_eq!(s.programs().len(), 3);
    let classes: Vec<InstrumentClass> = s.instrument_classes().into_iter().collect();
    assert!(classes.contains(&InstrumentClass::Percussive));
    assert!(classes.contains(&InstrumentClass::Bass));
    assert!(classes.contains(&InstrumentClass::Strings));
    assert!(classes.contains(&InstrumentClass::Piano));
}

#[test]
fn test_retain_keeps_end_time() {
    let s = ensemble();
    let no_drums = s.retain(|n| !n.is_drum());
    assert_eq!(no_drums.len(), 4);
    assert_eq!(no_drums.duration(), s.duration());
}

#[test]
fn test_anchored_windows_cover_sequence() {
    let s = ensemble();
    let windows = s.windows_anchored(3.0);
    assert_eq!(windows.effective_length(), 3.0);
    let windows: Vec<_> = windows.collect();

    let starts: Vec<f64> = windows.iter().map(|w| w.start).collect();
    assert_eq!(starts, vec![0.0, 1.0, 2.0, 4.0]);
    assert_eq!(windows[0].note_count(), 4);
    assert!(windows.iter().all(|w| w.end <= s.duration()));
}

#[test]
fn test_anchored_windows_clamped_to_short_sequence() {
    let s = Sequence::new(vec![Note::new(60, 0.0, 1.0, 80, 0), Note::new(62, 1.0, 1.0, 80, 0)])
        .unwrap();
    let windows = s.windows_anchored(30.0);
    assert_eq!(windows.effective_length(), 2.0);
    assert_eq!(windows.count(), 1);
}

#[test]
fn test_duration_chunks_partition_notes() {
    let s = ensemble();
    let chunks: Vec<_> = s.chunks_by_duration(5).collect();
    assert_eq!(chunks.len(), 5);
    assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), s.len());
    assert!(chunks[4].is_empty());
}

#[test]
fn test_invalid_notes_rejected() {
    let err = Sequence::new(vec![
        Note::new(60, 0.0, 1.0, 80, 0),
        Note::new(60, 1.0, 0.0, 80, 0),
    ])
    .unwrap_err();
    assert!(matches!(err, DataIntegrityError::InvalidDuration { index: 1, .. }));

    let err = Sequence::with_end_time(vec![Note::new(60, 0.0, 4.0, 80, 0)], 2.0).unwrap_err();
    assert!(matches!(err, DataIntegrityError::InvalidEndTime { .. }));
}
