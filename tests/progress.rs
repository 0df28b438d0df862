//! Progress reporting through transcode jobs.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{MemoryReader, MemoryWriter, WriterScript};
use reframe::{
    MediaMetadata, OutputLocation, ProgressCallback, ProgressInfo, TranscodeJob, TranscodeOptions,
    VideoMetadata,
};

struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            infos: Mutex::new(Vec::new()),
        })
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

fn run_with(recorder: Arc<RecordingProgress>, batch_size: u64, metadata: MediaMetadata) {
    let dir = tempfile::tempdir().unwrap();
    let options = TranscodeOptions::new()
        .with_target_frame_rate(10.0)
        .with_progress(recorder)
        .with_batch_size(batch_size)
        .with_output(OutputLocation::Explicit(dir.path().join("progress.mp4")));
    let (factory, _probe) = MemoryWriter::factory(WriterScript::default());

    TranscodeJob::new(MemoryReader::new(metadata), options)
        .run(factory)
        .unwrap();
}

fn one_second_at(fps: f64) -> MediaMetadata {
    MediaMetadata::video_only(VideoMetadata::new(320, 240, fps), Duration::from_secs(1))
}

// ── ProgressInfo ───────────────────────────────────────────────────

#[test]
fn progress_current_increases() {
    let recorder = RecordingProgress::new();
    run_with(recorder.clone(), 1, one_second_at(30.0));

    let infos = recorder.infos.lock().unwrap();
    assert_eq!(infos.len(), 31);
    for window in infos.windows(2) {
        assert!(window[1].current >= window[0].current);
    }
}

#[test]
fn progress_timestamps_follow_the_source() {
    let recorder = RecordingProgress::new();
    run_with(recorder.clone(), 5, one_second_at(25.0));

    let infos = recorder.infos.lock().unwrap();
    let timestamps: Vec<Duration> = infos
        .iter()
        .filter_map(|info| info.current_timestamp)
        .collect();
    assert!(timestamps.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(
        timestamps.last(),
        Some(&Duration::from_secs_f64(24.0 / 25.0))
    );
}

#[test]
fn progress_reports_percentage_and_remaining() {
    let recorder = RecordingProgress::new();
    run_with(recorder.clone(), 10, one_second_at(40.0));

    let infos = recorder.infos.lock().unwrap();
    let first = &infos[0];
    assert_eq!(first.current, 10);
    assert_eq!(first.total, Some(40));
    assert_eq!(first.percentage, Some(25.0));
    assert!(first.estimated_remaining.is_some());

    let last = infos.last().unwrap();
    assert_eq!(last.percentage, Some(100.0));
    assert_eq!(last.estimated_remaining, Some(Duration::ZERO));
}

#[test]
fn progress_without_frames_still_reports_once() {
    let recorder = RecordingProgress::new();
    let metadata = MediaMetadata::video_only(VideoMetadata::new(320, 240, 30.0), Duration::ZERO);
    run_with(recorder.clone(), 1, metadata);

    let infos = recorder.infos.lock().unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].current, 0);
    assert_eq!(infos[0].percentage, None);
    assert_eq!(infos[0].estimated_remaining, None);
}
