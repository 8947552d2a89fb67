//! One module per command. Each exposes a request struct, a pure function
//! building the ffmpeg arguments, and a `Toolkit` method that runs it.

pub mod audio;
pub mod convert;
pub mod gif;
pub mod info;
pub mod merge;
pub mod metadata;
pub mod optimize;
pub mod resize;
pub mod split;
pub mod subtitle;
pub mod thumbnail;
pub mod trim;

pub use audio::ExtractAudioRequest;
pub use convert::ConvertRequest;
pub use gif::{Dither, GifRequest};
pub use info::{Capabilities, ToolStatus};
pub use merge::MergeRequest;
pub use metadata::{MetadataKey, MetadataRequest};
pub use optimize::{OptimizeRequest, OptimizeTarget};
pub use resize::{ResizeRequest, ScaleAlgorithm};
pub use split::{SplitBy, SplitRequest};
pub use subtitle::{SubtitleMode, SubtitleRequest};
pub use thumbnail::{FramePosition, ThumbnailRequest};
pub use trim::TrimRequest;
