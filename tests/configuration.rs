//! TranscodeOptions, VideoSettings, and error display tests.

use std::path::PathBuf;
use std::sync::Arc;

use reframe::{
    ContainerFormat, OutputLocation, RandomizedWithinBucket, ReframeError, TrackKind,
    TranscodeOptions, VideoCodec, VideoSettings,
};

// ── TranscodeOptions builder ───────────────────────────────────────

#[test]
fn options_defaults() {
    let options = TranscodeOptions::new();
    let debug = format!("{options:?}");
    assert!(debug.contains("TranscodeOptions"));
    assert!(debug.contains("selector: \"even\""));
    assert!(debug.contains("batch_size: 1"));
    assert!(debug.contains("overwrite: true"));
    assert!(debug.contains("include_audio: true"));

    assert_eq!(options.target_frame_rate(), None);
    assert_eq!(options.container(), ContainerFormat::Mp4);
    assert_eq!(options.video_settings(), &VideoSettings::default());
    assert!(options.includes_audio());
}

#[test]
fn options_with_batch_size_clamps_zero() {
    let options = TranscodeOptions::new().with_batch_size(0);
    assert!(format!("{options:?}").contains("batch_size: 1"));

    let options = TranscodeOptions::new().with_batch_size(25);
    assert!(format!("{options:?}").contains("batch_size: 25"));
}

#[test]
fn options_builder_chain() {
    let options = TranscodeOptions::new()
        .with_target_frame_rate(12.5)
        .with_selector(Arc::new(RandomizedWithinBucket::with_seed(3)))
        .with_container(ContainerFormat::M4v)
        .with_overwrite(false)
        .with_audio(false)
        .with_output(OutputLocation::Explicit(PathBuf::from("clip.m4v")))
        .with_video_settings(VideoSettings::default().codec(VideoCodec::H265).crf(28));

    assert_eq!(options.target_frame_rate(), Some(12.5));
    assert_eq!(options.container(), ContainerFormat::M4v);
    assert_eq!(options.video_settings().codec, VideoCodec::H265);
    assert_eq!(options.video_settings().crf, Some(28));
    assert!(!options.includes_audio());

    let debug = format!("{options:?}");
    assert!(debug.contains("selector: \"random\""));
    assert!(debug.contains("overwrite: false"));
    assert!(debug.contains("clip.m4v"));
}

#[test]
fn options_clone_shares_selector() {
    let options = TranscodeOptions::new().with_selector(Arc::new(RandomizedWithinBucket::new()));
    let clone = options.clone();
    assert_eq!(format!("{options:?}"), format!("{clone:?}"));
}

#[test]
fn default_output_is_system_temp() {
    assert_eq!(
        OutputLocation::default(),
        OutputLocation::Temporary { directory: None }
    );
}

// ── VideoSettings ──────────────────────────────────────────────────

#[test]
fn settings_default_to_h264_crf_23() {
    let settings = VideoSettings::default();
    assert_eq!(settings.codec, VideoCodec::H264);
    assert_eq!(settings.crf, Some(23));
    assert_eq!(settings.bitrate, None);

    let dictionary = settings.to_dictionary(1920, 1080, 30.0);
    assert_eq!(dictionary["codec"], "h264");
    assert_eq!(dictionary["width"], "1920");
    assert_eq!(dictionary["height"], "1080");
    assert_eq!(dictionary["crf"], "23");
    assert!(!dictionary.contains_key("g"));
}

#[test]
fn settings_explicit_resolution_and_keyframes() {
    let settings = VideoSettings::default()
        .resolution(640, 360)
        .keyframe_interval(48)
        .bitrate(1_500_000);
    let dictionary = settings.to_dictionary(1920, 1080, 12.5);

    assert_eq!(dictionary["width"], "640");
    assert_eq!(dictionary["height"], "360");
    assert_eq!(dictionary["g"], "48");
    assert_eq!(dictionary["bitrate"], "1500000");
    assert_eq!(dictionary["frame_rate"], "12.5");
}

#[test]
fn codec_names_round_trip_through_aliases() {
    for codec in [VideoCodec::H264, VideoCodec::H265, VideoCodec::Mpeg4] {
        assert_eq!(VideoCodec::from_name(codec.name()), Some(codec));
    }
    assert_eq!(VideoCodec::from_name("x264"), Some(VideoCodec::H264));
}

#[test]
fn container_extensions_and_muxers() {
    assert_eq!(ContainerFormat::Mp4.extension(), "mp4");
    assert_eq!(ContainerFormat::Mov.muxer_name(), "mov");
    assert_eq!(ContainerFormat::M4v.muxer_name(), "ipod");
    assert_eq!(ContainerFormat::from_extension("qt"), Some(ContainerFormat::Mov));
    assert_eq!(ContainerFormat::from_extension("mkv"), None);
}

// ── Errors ─────────────────────────────────────────────────────────

#[test]
fn error_display() {
    assert_eq!(
        ReframeError::NoVideoTrack.to_string(),
        "No video track found in source"
    );
    assert_eq!(
        ReframeError::SinkFailure("encoder lost".to_string()).to_string(),
        "Sink failure: encoder lost"
    );
    assert_eq!(
        ReframeError::OutputExists(PathBuf::from("out.mp4")).to_string(),
        "Output file already exists: out.mp4"
    );
    assert_eq!(
        ReframeError::OutputIsSource(PathBuf::from("in.mp4")).to_string(),
        "Output in.mp4 is the source file"
    );
    assert_eq!(
        ReframeError::PumpPanicked(TrackKind::Audio).to_string(),
        "The audio pump panicked"
    );
    let invalid = ReframeError::InvalidOutputDirectory {
        path: PathBuf::from("/nope"),
        reason: "not a directory".to_string(),
    };
    assert_eq!(
        invalid.to_string(),
        "Invalid output directory /nope: not a directory"
    );
}

#[test]
fn io_errors_convert() {
    let error: ReframeError = std::io::Error::other("boom").into();
    assert!(matches!(error, ReframeError::IoError(_)));
}
