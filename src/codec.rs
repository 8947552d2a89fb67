//! Codec and container enumerations understood by the argument builders.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{MediaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    H264,
    H265,
    Vp9,
    Av1,
    H264Nvenc,
    HevcNvenc,
    H264Qsv,
    HevcQsv,
    H264VideoToolbox,
    HevcVideoToolbox,
    Copy,
}

/// How an encoder expresses constant quality, if it has such a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityScale {
    pub flag: &'static str,
    pub max: u8,
}

impl VideoCodec {
    pub const ALL: [VideoCodec; 11] = [
        VideoCodec::H264,
        VideoCodec::H265,
        VideoCodec::Vp9,
        VideoCodec::Av1,
        VideoCodec::H264Nvenc,
        VideoCodec::HevcNvenc,
        VideoCodec::H264Qsv,
        VideoCodec::HevcQsv,
        VideoCodec::H264VideoToolbox,
        VideoCodec::HevcVideoToolbox,
        VideoCodec::Copy,
    ];

    /// Encoder name passed to `-c:v`.
    pub fn encoder(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
            VideoCodec::Vp9 => "libvpx-vp9",
            VideoCodec::Av1 => "libsvtav1",
            VideoCodec::H264Nvenc => "h264_nvenc",
            VideoCodec::HevcNvenc => "hevc_nvenc",
            VideoCodec::H264Qsv => "h264_qsv",
            VideoCodec::HevcQsv => "hevc_qsv",
            VideoCodec::H264VideoToolbox => "h264_videotoolbox",
            VideoCodec::HevcVideoToolbox => "hevc_videotoolbox",
            VideoCodec::Copy => "copy",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "h265",
            VideoCodec::Vp9 => "vp9",
            VideoCodec::Av1 => "av1",
            VideoCodec::H264Nvenc => "h264-nvenc",
            VideoCodec::HevcNvenc => "hevc-nvenc",
            VideoCodec::H264Qsv => "h264-qsv",
            VideoCodec::HevcQsv => "hevc-qsv",
            VideoCodec::H264VideoToolbox => "h264-videotoolbox",
            VideoCodec::HevcVideoToolbox => "hevc-videotoolbox",
            VideoCodec::Copy => "copy",
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(
            self,
            VideoCodec::H264Nvenc
                | VideoCodec::HevcNvenc
                | VideoCodec::H264Qsv
                | VideoCodec::HevcQsv
                | VideoCodec::H264VideoToolbox
                | VideoCodec::HevcVideoToolbox
        )
    }

    pub fn quality_scale(&self) -> Option<QualityScale> {
        match self {
            VideoCodec::H264 | VideoCodec::H265 => Some(QualityScale { flag: "-crf", max: 51 }),
            VideoCodec::Vp9 | VideoCodec::Av1 => Some(QualityScale { flag: "-crf", max: 63 }),
            VideoCodec::H264Nvenc | VideoCodec::HevcNvenc => Some(QualityScale { flag: "-cq", max: 51 }),
            VideoCodec::H264Qsv | VideoCodec::HevcQsv => {
                Some(QualityScale { flag: "-global_quality", max: 51 })
            }
            VideoCodec::H264VideoToolbox | VideoCodec::HevcVideoToolbox | VideoCodec::Copy => None,
        }
    }

    /// Whether `-preset ultrafast..veryslow` applies.
    pub fn supports_speed_preset(&self) -> bool {
        matches!(self, VideoCodec::H264 | VideoCodec::H265)
    }

    pub fn hardware_encoders() -> impl Iterator<Item = VideoCodec> {
        Self::ALL.into_iter().filter(|codec| codec.is_hardware())
    }
}

impl FromStr for VideoCodec {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        let codec = match normalized.as_str() {
            "h264" | "x264" | "libx264" | "avc" => VideoCodec::H264,
            "h265" | "hevc" | "x265" | "libx265" => VideoCodec::H265,
            "vp9" | "libvpx-vp9" => VideoCodec::Vp9,
            "av1" | "libsvtav1" | "svt-av1" => VideoCodec::Av1,
            "h264-nvenc" | "nvenc" => VideoCodec::H264Nvenc,
            "hevc-nvenc" | "h265-nvenc" => VideoCodec::HevcNvenc,
            "h264-qsv" | "qsv" => VideoCodec::H264Qsv,
            "hevc-qsv" | "h265-qsv" => VideoCodec::HevcQsv,
            "h264-videotoolbox" | "videotoolbox" => VideoCodec::H264VideoToolbox,
            "hevc-videotoolbox" | "h265-videotoolbox" => VideoCodec::HevcVideoToolbox,
            "copy" => VideoCodec::Copy,
            _ => {
                let allowed: Vec<&str> = Self::ALL.iter().map(|codec| codec.name()).collect();
                return Err(MediaError::Validation(format!(
                    "unknown video codec '{}'. Valid codecs: {}",
                    s,
                    allowed.join(", ")
                )));
            }
        };
        Ok(codec)
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCodec {
    Aac,
    Mp3,
    Opus,
    Vorbis,
    Flac,
    Pcm,
    Ac3,
    Copy,
}

impl AudioCodec {
    pub const ALL: [AudioCodec; 8] = [
        AudioCodec::Aac,
        AudioCodec::Mp3,
        AudioCodec::Opus,
        AudioCodec::Vorbis,
        AudioCodec::Flac,
        AudioCodec::Pcm,
        AudioCodec::Ac3,
        AudioCodec::Copy,
    ];

    pub fn encoder(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "libmp3lame",
            AudioCodec::Opus => "libopus",
            AudioCodec::Vorbis => "libvorbis",
            AudioCodec::Flac => "flac",
            AudioCodec::Pcm => "pcm_s16le",
            AudioCodec::Ac3 => "ac3",
            AudioCodec::Copy => "copy",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Opus => "opus",
            AudioCodec::Vorbis => "vorbis",
            AudioCodec::Flac => "flac",
            AudioCodec::Pcm => "pcm",
            AudioCodec::Ac3 => "ac3",
            AudioCodec::Copy => "copy",
        }
    }

    /// Lossless and pass-through codecs take no bitrate.
    pub fn accepts_bitrate(&self) -> bool {
        !matches!(self, AudioCodec::Flac | AudioCodec::Pcm | AudioCodec::Copy)
    }

    /// Codec implied by an audio file extension.
    pub fn for_extension(path: &Path) -> Option<AudioCodec> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        let codec = match ext.as_str() {
            "mp3" => AudioCodec::Mp3,
            "m4a" | "aac" => AudioCodec::Aac,
            "opus" => AudioCodec::Opus,
            "ogg" | "oga" => AudioCodec::Vorbis,
            "flac" => AudioCodec::Flac,
            "wav" => AudioCodec::Pcm,
            "ac3" => AudioCodec::Ac3,
            "mka" => AudioCodec::Copy,
            _ => return None,
        };
        Some(codec)
    }
}

impl FromStr for AudioCodec {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        let codec = match s.trim().to_lowercase().as_str() {
            "aac" => AudioCodec::Aac,
            "mp3" | "libmp3lame" => AudioCodec::Mp3,
            "opus" | "libopus" => AudioCodec::Opus,
            "vorbis" | "libvorbis" | "ogg" => AudioCodec::Vorbis,
            "flac" => AudioCodec::Flac,
            "pcm" | "wav" | "pcm_s16le" => AudioCodec::Pcm,
            "ac3" => AudioCodec::Ac3,
            "copy" => AudioCodec::Copy,
            _ => {
                let allowed: Vec<&str> = Self::ALL.iter().map(|codec| codec.name()).collect();
                return Err(MediaError::Validation(format!(
                    "unknown audio codec '{}'. Valid codecs: {}",
                    s,
                    allowed.join(", ")
                )));
            }
        };
        Ok(codec)
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercased extension of `path`, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Containers that benefit from `-movflags +faststart`.
pub fn is_mp4_family(path: &Path) -> bool {
    matches!(extension_of(path).as_deref(), Some("mp4" | "m4v" | "mov" | "m4a"))
}
