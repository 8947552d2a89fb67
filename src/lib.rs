//! mediakit - typed wrappers around ffmpeg and ffprobe
//!
//! Each command validates a request, builds an ordered ffmpeg argument list,
//! runs the tool through an injectable runner and reports the output file.

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod media;
pub mod operations;
pub mod output;
pub mod quality;
pub mod time;
pub mod toolkit;

pub use error::{MediaError, Result};
pub use output::{Outcome, OutputFileHandle};
pub use toolkit::Toolkit;
