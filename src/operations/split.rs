use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::codec::extension_of;
use crate::error::{MediaError, Result};
use crate::media::{ArgumentBuilder, ArgumentList, Tool};
use crate::output::{Outcome, OutputFileHandle};
use crate::time::Timestamp;
use crate::toolkit::{require_input, Toolkit};

/// The segment number is rendered with `%03d`.
pub const MAX_PARTS: u32 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitBy {
    Duration(Timestamp),
    /// Equal parts of the probed duration.
    Parts(u32),
}

#[derive(Debug, Clone)]
pub struct SplitRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub by: SplitBy,
    /// File name prefix; the input's stem when absent.
    pub prefix: Option<String>,
    /// Re-encode with forced keyframes so every cut lands exactly on a boundary.
    pub reencode: bool,
    pub overwrite: bool,
}

impl SplitRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output_dir: Q, by: SplitBy) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            by,
            prefix: None,
            reencode: false,
            overwrite: false,
        }
    }

    fn validate(&self) -> Result<()> {
        match self.by {
            SplitBy::Duration(length) if length.is_zero() => Err(MediaError::Validation(
                "segment length must be positive".to_string(),
            )),
            SplitBy::Parts(parts) => check_parts(parts),
            SplitBy::Duration(_) => Ok(()),
        }
    }
}

fn check_parts(parts: u32) -> Result<()> {
    if parts == 0 || parts > MAX_PARTS {
        return Err(MediaError::Validation(format!(
            "parts must be between 1 and {}, got {}",
            MAX_PARTS, parts
        )));
    }
    Ok(())
}

/// Names written by one split: `<prefix>_<NNN>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPattern {
    prefix: String,
    extension: String,
}

impl SegmentPattern {
    pub fn for_request(request: &SplitRequest) -> Result<Self> {
        let extension = extension_of(&request.input).ok_or_else(|| {
            MediaError::Validation(format!(
                "cannot pick a segment container: '{}' has no extension",
                request.input.display()
            ))
        })?;

        let prefix = match &request.prefix {
            Some(prefix) => prefix.trim().to_string(),
            None => request
                .input
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "segment".to_string()),
        };
        if prefix.is_empty() || prefix.contains(['/', '\\', '%']) {
            return Err(MediaError::Validation(format!(
                "invalid segment prefix '{}'",
                prefix
            )));
        }

        Ok(Self { prefix, extension })
    }

    /// The `%03d` template handed to the segment muxer.
    pub fn template(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_%03d.{}", self.prefix, self.extension))
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.segment_number(file_name).is_some()
    }

    /// The `NNN` of `<prefix>_<NNN>.<ext>`.
    pub fn segment_number(&self, file_name: &str) -> Option<u64> {
        let number = file_name
            .strip_prefix(&self.prefix)?
            .strip_prefix('_')?
            .strip_suffix(&self.extension)?
            .strip_suffix('.')?;
        if number.len() < 3 || !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        number.parse().ok()
    }

    /// Files in `dir` (not recursing) that fit the pattern, in segment order.
    pub fn existing(&self, dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<(u64, PathBuf)> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let number = self.segment_number(&entry.file_name().to_string_lossy())?;
                Some((number, entry.into_path()))
            })
            .collect();
        found.sort();
        found.into_iter().map(|(_, path)| path).collect()
    }
}

/// Segment length for `parts` equal pieces of `duration`, rounded up so no
/// trailing sliver becomes an extra part.
pub fn segment_length(duration: Timestamp, parts: u32) -> Result<Timestamp> {
    check_parts(parts)?;
    let millis = duration.as_millis().div_ceil(u64::from(parts));
    if millis == 0 {
        return Err(MediaError::Validation("input is too short to split".to_string()));
    }
    Ok(Timestamp::from_millis(millis))
}

pub fn build_args(
    request: &SplitRequest,
    segment: Timestamp,
    input: &Path,
    pattern: &SegmentPattern,
    output_dir: &Path,
) -> Result<ArgumentList> {
    if segment.is_zero() {
        return Err(MediaError::Validation("segment length must be positive".to_string()));
    }
    let length = segment.to_ffmpeg();

    let mut builder = ArgumentBuilder::ffmpeg().input_path(input).map("0");
    builder = if request.reencode {
        builder
            .video_codec("libx264")
            .audio_codec("aac")
            .codec(["-force_key_frames".to_string(), format!("expr:gte(t,n_forced*{})", length)])
    } else {
        builder.copy_all()
    };

    Ok(builder
        .output_option(["-f", "segment", "-segment_time", length.as_str(), "-reset_timestamps", "1"])
        .build(pattern.template(output_dir)))
}

impl Toolkit {
    /// Cut `input` into consecutive files of equal length.
    ///
    /// Segments are written to a hidden directory next to the final ones and
    /// replace an earlier set of the same name only once ffmpeg succeeded.
    pub async fn split(&self, request: &SplitRequest) -> Result<Outcome<Vec<OutputFileHandle>>> {
        let input = require_input(&request.input)?;
        let pattern = SegmentPattern::for_request(request)?;
        request.validate()?;

        let output_dir = std::path::absolute(&request.output_dir)?;
        let existing = pattern.existing(&output_dir);
        if !existing.is_empty() && !self.overwrite(request.overwrite) {
            warn!(
                "{} segment(s) named {} already exist; skipping (use overwrite to replace them)",
                existing.len(),
                pattern.template(&output_dir).display()
            );
            return Ok(Outcome::skipped(&output_dir));
        }

        self.ensure_available(Tool::Ffmpeg).await?;

        let segment = match request.by {
            SplitBy::Duration(length) => length,
            SplitBy::Parts(parts) => {
                let duration = self.probe(&input).await?.duration_timestamp()?;
                segment_length(duration, parts)?
            }
        };

        tokio::fs::create_dir_all(&output_dir).await?;
        let staging = tempfile::Builder::new()
            .prefix(".split-")
            .tempdir_in(&output_dir)?;
        let args = build_args(request, segment, &input, &pattern, staging.path())?;

        info!("Split -> {} every {}", output_dir.display(), segment);
        self.run_tool(Tool::Ffmpeg, "Split", &args).await?;

        let produced = pattern.existing(staging.path());
        if produced.is_empty() {
            return Err(MediaError::MissingOutput(
                pattern.template(&output_dir).display().to_string(),
            ));
        }

        // Stale higher-numbered parts would otherwise be reported as ours.
        for path in pattern.existing(&output_dir) {
            tokio::fs::remove_file(&path).await?;
        }

        let mut handles = Vec::with_capacity(produced.len());
        for path in produced {
            let Some(name) = path.file_name() else {
                continue;
            };
            let target = output_dir.join(name);
            tokio::fs::rename(&path, &target).await?;
            handles.push(OutputFileHandle::resolve(&target).await?);
        }

        info!("Split completed: {} segment(s)", handles.len());
        Ok(Outcome::Completed(handles))
    }
}
