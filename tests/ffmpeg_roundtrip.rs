//! End-to-end checks against the real ffmpeg/ffprobe binaries.
//!
//! Every test returns early when the tools are not installed.

use std::collections::BTreeMap;
use std::path::Path;

use assert_fs::TempDir;
use mediakit::config::Config;
use mediakit::media::{ArgumentBuilder, InputSpec, Tool, ToolRunner, ToolRunnerFactory};
use mediakit::operations::{MetadataKey, MetadataRequest, TrimRequest};
use mediakit::time::TimeRange;
use mediakit::Toolkit;

async fn toolkit_with_tools() -> Option<Toolkit> {
    let toolkit = Toolkit::with_system_runner(Config::default());
    if toolkit.is_available(Tool::Ffmpeg).await && toolkit.is_available(Tool::Ffprobe).await {
        Some(toolkit)
    } else {
        eprintln!("ffmpeg/ffprobe not found, skipping");
        None
    }
}

/// One second of test pattern in Matroska, tagged with a title and comment.
async fn make_source(path: &Path) {
    let args = ArgumentBuilder::ffmpeg()
        .input(InputSpec::new("testsrc=duration=1:size=64x64:rate=10").format("lavfi"))
        .video_codec("ffv1")
        .metadata("title", "Original")
        .metadata("comment", "Old")
        .build(path);

    let runner = ToolRunnerFactory::create_runner(Config::default().tools);
    let result = runner.run(Tool::Ffmpeg, &args).await.unwrap();
    assert!(result.success(), "ffmpeg failed: {}", result.stderr);
}

fn tag<'a>(tags: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value.as_str())
}

#[tokio::test]
async fn test_set_metadata_keeps_untouched_tags() {
    let Some(toolkit) = toolkit_with_tools().await else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source.mkv");
    let output = temp.path().join("tagged.mkv");
    make_source(&source).await;

    let request = MetadataRequest::new(&source, &output).entry(MetadataKey::Title, "Renamed");
    let handle = toolkit.set_metadata(&request).await.unwrap().completed().unwrap();
    assert!(handle.size > 0);

    let tags = toolkit.show_metadata(&output).await.unwrap();
    assert_eq!(tag(&tags, "title"), Some("Renamed"));
    assert_eq!(tag(&tags, "comment"), Some("Old"));
}

#[tokio::test]
async fn test_clear_existing_drops_old_tags() {
    let Some(toolkit) = toolkit_with_tools().await else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source.mkv");
    let output = temp.path().join("cleared.mkv");
    make_source(&source).await;

    let mut request = MetadataRequest::new(&source, &output).entry(MetadataKey::Artist, "Someone");
    request.clear_existing = true;
    toolkit.set_metadata(&request).await.unwrap();

    let tags = toolkit.show_metadata(&output).await.unwrap();
    assert_eq!(tag(&tags, "artist"), Some("Someone"));
    assert_eq!(tag(&tags, "comment"), None);
    assert_eq!(tag(&tags, "title"), None);
}

#[tokio::test]
async fn test_trim_and_probe() {
    let Some(toolkit) = toolkit_with_tools().await else {
        return;
    };
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source.mkv");
    let output = temp.path().join("cut.mkv");
    make_source(&source).await;

    let range = TimeRange::from_parts(None, None, Some("0.5")).unwrap();
    let request = TrimRequest::new(&source, &output, range);
    toolkit.trim(&request).await.unwrap().completed().unwrap();

    let descriptor = toolkit.probe(&output).await.unwrap();
    let video = descriptor.video.unwrap();
    assert_eq!((video.width, video.height), (64, 64));
    assert!(!temp.path().read_dir().unwrap().any(|entry| {
        entry.unwrap().file_name().to_string_lossy().contains(".part")
    }));
}
