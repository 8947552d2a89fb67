use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::codec::VideoCodec;
use crate::error::{MediaError, Result};
use crate::media::probe::{self, MediaDescriptor};
use crate::media::Tool;
use crate::toolkit::{require_input, Toolkit};

/// Availability and version of one external tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolStatus {
    pub tool: String,
    pub available: bool,
    pub version: Option<String>,
}

/// What the installed tools can do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capabilities {
    pub ffmpeg: ToolStatus,
    pub ffprobe: ToolStatus,
    /// Hardware encoders compiled into ffmpeg. Listed does not guarantee a
    /// usable device is present.
    pub hardware_encoders: Vec<String>,
}

impl Toolkit {
    /// Describe the container and first video/audio streams of `input`.
    pub async fn probe(&self, input: &Path) -> Result<MediaDescriptor> {
        let input = require_input(input)?;
        self.ensure_available(Tool::Ffprobe).await?;

        info!("Probing {}", input.display());
        let result = self
            .run_tool(Tool::Ffprobe, "Probe", &probe::probe_args(&input))
            .await?;

        probe::parse_probe_output(&result.stdout)
    }

    /// First line of `<tool> -version`.
    pub async fn version(&self, tool: Tool) -> Result<String> {
        self.ensure_available(tool).await?;
        let result = self
            .run_tool(tool, "Version query", &probe::version_args())
            .await?;
        probe::parse_version(&result.stdout)
            .ok_or_else(|| MediaError::Probe(format!("{} printed no version information", tool)))
    }

    /// Availability of both tools, their versions, and hardware encoders.
    /// Never fails because a tool is missing; that is reported in the result.
    pub async fn capabilities(&self) -> Result<Capabilities> {
        let ffmpeg = self.tool_status(Tool::Ffmpeg).await?;
        let ffprobe = self.tool_status(Tool::Ffprobe).await?;

        let hardware_encoders = if ffmpeg.available {
            let result = self
                .run_tool(Tool::Ffmpeg, "Encoder query", &probe::encoders_args())
                .await?;
            probe::parse_hardware_encoders(&result.stdout)
                .iter()
                .map(VideoCodec::to_string)
                .collect()
        } else {
            Vec::new()
        };

        Ok(Capabilities {
            ffmpeg,
            ffprobe,
            hardware_encoders,
        })
    }

    async fn tool_status(&self, tool: Tool) -> Result<ToolStatus> {
        let available = self.is_available(tool).await;
        let version = if available {
            Some(self.version(tool).await?)
        } else {
            None
        };
        Ok(ToolStatus {
            tool: tool.to_string(),
            available,
            version,
        })
    }
}
