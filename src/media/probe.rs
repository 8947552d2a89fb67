use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::codec::VideoCodec;
use crate::error::{MediaError, Result};
use crate::time::Timestamp;
use super::ArgumentList;

/// Structural summary of a media file as reported by ffprobe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub format_name: String,
    pub format_long_name: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    /// Bits per second
    pub bit_rate: Option<u64>,
    /// Bytes
    pub size: Option<u64>,
    pub tags: BTreeMap<String, String>,
    pub video: Option<VideoDescriptor>,
    pub audio: Option<AudioDescriptor>,
    pub stream_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
    pub pixel_format: Option<String>,
    pub bit_rate: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDescriptor {
    pub codec: String,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub bit_rate: Option<u64>,
}

impl MediaDescriptor {
    /// Duration as a timestamp, required by commands that position relative to it.
    pub fn duration_timestamp(&self) -> Result<Timestamp> {
        let seconds = self
            .duration
            .filter(|d| *d > 0.0)
            .ok_or_else(|| MediaError::Probe("input has no known duration".to_string()))?;
        Timestamp::from_secs_f64(seconds)
    }
}

/// `ffprobe` arguments producing JSON with format and stream sections.
pub fn probe_args(input: &Path) -> ArgumentList {
    ArgumentList::raw([
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        input.to_string_lossy().to_string(),
    ])
}

pub fn version_args() -> ArgumentList {
    ArgumentList::raw(["-version"])
}

pub fn encoders_args() -> ArgumentList {
    ArgumentList::raw(["-hide_banner", "-encoders"])
}

/// First line of `-version` output, e.g. `ffmpeg version 6.1.1 Copyright ...`.
pub fn parse_version(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
}

/// Hardware encoders listed in `ffmpeg -encoders` output.
pub fn parse_hardware_encoders(output: &str) -> Vec<VideoCodec> {
    // Lines look like ` V....D h264_nvenc           NVIDIA NVENC H.264 encoder`
    let listed: Vec<&str> = output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();

    VideoCodec::hardware_encoders()
        .filter(|codec| listed.contains(&codec.encoder()))
        .collect()
}

// ffprobe reports most numbers as strings.
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: String,
    format_long_name: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
    size: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    pix_fmt: Option<String>,
    bit_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(json: &str) -> Result<MediaDescriptor> {
    let parsed: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| MediaError::Probe(format!("could not parse ffprobe output: {}", e)))?;

    let format = parsed
        .format
        .ok_or_else(|| MediaError::Probe("ffprobe output has no format section".to_string()))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .map(|s| VideoDescriptor {
            codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            width: s.width.unwrap_or(0),
            height: s.height.unwrap_or(0),
            frame_rate: s
                .avg_frame_rate
                .as_deref()
                .and_then(parse_rational)
                .or_else(|| s.r_frame_rate.as_deref().and_then(parse_rational)),
            pixel_format: s.pix_fmt.clone(),
            bit_rate: parse_number(s.bit_rate.as_deref()),
        });

    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioDescriptor {
            codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            sample_rate: parse_number(s.sample_rate.as_deref()),
            channels: s.channels,
            bit_rate: parse_number(s.bit_rate.as_deref()),
        });

    Ok(MediaDescriptor {
        format_name: format.format_name,
        format_long_name: format.format_long_name,
        duration: format.duration.as_deref().and_then(|d| d.parse::<f64>().ok()),
        bit_rate: parse_number(format.bit_rate.as_deref()),
        size: parse_number(format.size.as_deref()),
        tags: format.tags,
        video,
        audio,
        stream_count: parsed.streams.len(),
    })
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

/// `30000/1001` → 29.97; `0/0` → None.
fn parse_rational(value: &str) -> Option<f64> {
    let (num, den) = value.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 || num == 0.0 {
        return None;
    }
    Some(num / den)
}
