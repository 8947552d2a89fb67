use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::codec::{AudioCodec, VideoCodec};
use crate::media::Tool;
use crate::operations::{Dither, FramePosition, OptimizeTarget, ScaleAlgorithm, SubtitleMode};
use crate::quality::{Bitrate, EncoderSpeed, QualityOptions, QualityPreset};
use crate::time::Timestamp;

#[derive(Parser)]
#[command(author, version, about = "Convert, cut and inspect media files with ffmpeg", long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Replace output files that already exist
    #[arg(long, global = true)]
    pub overwrite: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Quality knobs shared by every encoding command.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct QualityArgs {
    /// Quality preset (low, medium, high, ultra)
    #[arg(long = "quality")]
    pub preset: Option<QualityPreset>,

    /// Constant rate factor; range depends on the codec
    #[arg(long)]
    pub crf: Option<u8>,

    /// Video bitrate, e.g. 2500k or 5M
    #[arg(long)]
    pub video_bitrate: Option<Bitrate>,

    /// Audio bitrate, e.g. 128k
    #[arg(long)]
    pub audio_bitrate: Option<Bitrate>,

    /// Encoder speed preset (ultrafast ... veryslow)
    #[arg(long)]
    pub speed: Option<EncoderSpeed>,
}

impl QualityArgs {
    pub fn into_options(self) -> QualityOptions {
        QualityOptions {
            preset: self.preset,
            crf: self.crf,
            video_bitrate: self.video_bitrate,
            audio_bitrate: self.audio_bitrate,
            speed: self.speed,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcode or remux a file
    Convert {
        /// Input media file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file; the extension picks the container
        #[arg(short, long)]
        output: PathBuf,

        /// Video codec (h264, h265, vp9, av1, h264-nvenc, ..., copy)
        #[arg(long)]
        video_codec: Option<VideoCodec>,

        /// Audio codec (aac, mp3, opus, vorbis, flac, pcm, ac3, copy)
        #[arg(long)]
        audio_codec: Option<AudioCodec>,

        #[command(flatten)]
        quality: QualityArgs,

        /// Drop the video stream
        #[arg(long)]
        no_video: bool,

        /// Drop the audio stream
        #[arg(long)]
        no_audio: bool,

        /// Force the container format
        #[arg(long)]
        format: Option<String>,

        /// Move the MP4 index to the front for streaming
        #[arg(long)]
        faststart: bool,
    },

    /// Scale the video stream
    Resize {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Target width; aspect ratio is kept when height is omitted
        #[arg(long)]
        width: Option<u32>,

        /// Target height; aspect ratio is kept when width is omitted
        #[arg(long)]
        height: Option<u32>,

        /// Scaling algorithm
        #[arg(long, default_value = "bicubic")]
        algorithm: ScaleAlgorithm,

        /// Letterbox to exactly width x height
        #[arg(long)]
        pad: bool,

        #[arg(long)]
        video_codec: Option<VideoCodec>,

        #[command(flatten)]
        quality: QualityArgs,
    },

    /// Cut a time range out of a file
    Trim {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Start time (seconds, MM:SS or HH:MM:SS[.mmm])
        #[arg(long)]
        start: Option<String>,

        /// End time; converted to a duration
        #[arg(long, conflicts_with = "duration")]
        end: Option<String>,

        /// Length of the cut
        #[arg(long)]
        duration: Option<String>,

        /// Seek after opening the input (slower, frame accurate)
        #[arg(long)]
        accurate: bool,

        /// Re-encode instead of copying streams
        #[arg(long)]
        reencode: bool,

        #[arg(long)]
        video_codec: Option<VideoCodec>,

        #[arg(long)]
        audio_codec: Option<AudioCodec>,

        #[command(flatten)]
        quality: QualityArgs,
    },

    /// Join files end to end
    Merge {
        /// Input files, in order (at least two)
        #[arg(short, long = "input", num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,

        /// Re-encode through the concat filter instead of stream copy
        #[arg(long)]
        reencode: bool,

        /// Leave audio out when re-encoding
        #[arg(long)]
        no_audio: bool,

        #[arg(long)]
        video_codec: Option<VideoCodec>,

        #[arg(long)]
        audio_codec: Option<AudioCodec>,

        #[command(flatten)]
        quality: QualityArgs,
    },

    /// Extract an audio stream to its own file
    ExtractAudio {
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file; the codec is inferred from its extension
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        codec: Option<AudioCodec>,

        #[arg(long)]
        bitrate: Option<Bitrate>,

        /// Sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Channel count (1-8)
        #[arg(long)]
        channels: Option<u8>,

        /// Audio stream index
        #[arg(long, default_value_t = 0)]
        stream: usize,
    },

    /// Save a single frame as an image
    Thumbnail {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Timestamp, or percentage of the duration such as 25%
        #[arg(long, default_value = "1")]
        at: FramePosition,

        #[arg(long)]
        width: Option<u32>,

        /// JPEG quality, 2 (best) to 31
        #[arg(long)]
        quality: Option<u8>,
    },

    /// Render an animated GIF
    Gif {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        start: Option<String>,

        #[arg(long, conflicts_with = "duration")]
        end: Option<String>,

        #[arg(long)]
        duration: Option<String>,

        /// Frames per second (1-50)
        #[arg(long, default_value_t = crate::operations::gif::DEFAULT_FPS)]
        fps: u32,

        #[arg(long, default_value_t = crate::operations::gif::DEFAULT_WIDTH)]
        width: u32,

        /// Palette size (2-256)
        #[arg(long, default_value_t = 256)]
        max_colors: u16,

        #[arg(long, default_value = "sierra2_4a")]
        dither: Dither,

        /// 0 loops forever, -1 plays once
        #[arg(long = "loop", default_value_t = 0, allow_negative_numbers = true)]
        loop_count: i32,

        /// Skip palette generation (faster, lower quality)
        #[arg(long)]
        no_palette: bool,
    },

    /// Burn in or embed a subtitle file
    Subtitle {
        #[arg(short, long)]
        input: PathBuf,

        /// Subtitle file (srt, ass, vtt)
        #[arg(short, long)]
        subtitles: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value = "burn")]
        mode: SubtitleMode,

        /// Three-letter language code for embedded subtitles
        #[arg(long)]
        language: Option<String>,

        /// ASS style override for burned subtitles
        #[arg(long)]
        style: Option<String>,
    },

    /// Show or change container metadata
    Metadata {
        #[command(subcommand)]
        action: MetadataAction,
    },

    /// Cut a file into equal segments
    Split {
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for the segments
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Segment length
        #[arg(long, conflicts_with = "parts", required_unless_present = "parts")]
        segment: Option<Timestamp>,

        /// Number of equal parts
        #[arg(long)]
        parts: Option<u32>,

        /// Segment file name prefix (default: input file stem)
        #[arg(long)]
        prefix: Option<String>,

        /// Re-encode for exact cut points
        #[arg(long)]
        reencode: bool,
    },

    /// Re-encode for web, mobile or archival use
    Optimize {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value = "web")]
        target: OptimizeTarget,

        /// Never exceed this width
        #[arg(long)]
        max_width: Option<u32>,

        /// Aim for this output size in megabytes
        #[arg(long)]
        target_size: Option<f64>,
    },

    /// Describe a media file
    Info {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Report tool availability, versions and hardware encoders
    Capabilities,

    /// Print the version line of ffmpeg or ffprobe
    Version {
        #[arg(default_value = "ffmpeg")]
        tool: Tool,
    },

    /// Manage the configuration file
    Config {
        /// Write the default configuration to this path
        #[arg(long)]
        write: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum MetadataAction {
    /// Print container tags
    Show {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write container tags, copying all streams
    Set {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Tag to write as key=value; repeatable
        #[arg(short, long = "entry")]
        entries: Vec<String>,

        /// Remove all existing tags first
        #[arg(long)]
        clear: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert_with_enums() {
        let args = Args::try_parse_from([
            "mediakit", "convert", "-i", "in.mov", "-o", "out.mp4",
            "--video-codec", "hevc", "--quality", "high", "--json",
        ])
        .unwrap();
        assert!(args.json);
        match args.command {
            Commands::Convert { video_codec, quality, .. } => {
                assert_eq!(video_codec, Some(VideoCodec::H265));
                assert_eq!(quality.preset, Some(QualityPreset::High));
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_invalid_enum_value_rejected() {
        let result = Args::try_parse_from([
            "mediakit", "resize", "-i", "a", "-o", "b", "--algorithm", "cubic",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_split_requires_length_or_parts() {
        assert!(Args::try_parse_from(["mediakit", "split", "-i", "a.mp4", "-o", "out"]).is_err());
        assert!(Args::try_parse_from([
            "mediakit", "split", "-i", "a.mp4", "-o", "out", "--segment", "10", "--parts", "3",
        ])
        .is_err());
        assert!(Args::try_parse_from(["mediakit", "split", "-i", "a.mp4", "-o", "out", "--parts", "3"]).is_ok());
    }

    #[test]
    fn test_merge_collects_inputs_in_order() {
        let args = Args::try_parse_from([
            "mediakit", "merge", "-i", "b.mp4", "-i", "a.mp4", "-o", "all.mp4",
        ])
        .unwrap();
        match args.command {
            Commands::Merge { inputs, .. } => {
                assert_eq!(inputs, vec![PathBuf::from("b.mp4"), PathBuf::from("a.mp4")]);
            }
            _ => panic!("expected merge"),
        }
    }
}
