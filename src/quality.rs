use std::fmt;
use std::str::FromStr;

use crate::codec::{AudioCodec, VideoCodec};
use crate::error::{MediaError, Result};

/// Named quality levels. They only fill in values the caller left unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPreset {
    Low,
    Medium,
    High,
    Ultra,
}

impl QualityPreset {
    /// CRF for a codec whose quality scale tops out at `max`.
    fn crf_for(&self, max: u8) -> u8 {
        match (self, max > 51) {
            (QualityPreset::Low, false) => 28,
            (QualityPreset::Medium, false) => 23,
            (QualityPreset::High, false) => 20,
            (QualityPreset::Ultra, false) => 17,
            (QualityPreset::Low, true) => 40,
            (QualityPreset::Medium, true) => 33,
            (QualityPreset::High, true) => 28,
            (QualityPreset::Ultra, true) => 24,
        }
    }

    /// Used for encoders without a constant-quality mode.
    fn video_bitrate(&self) -> Bitrate {
        let value = match self {
            QualityPreset::Low => "1M",
            QualityPreset::Medium => "2500k",
            QualityPreset::High => "5M",
            QualityPreset::Ultra => "8M",
        };
        Bitrate(value.to_string())
    }

    fn audio_bitrate(&self) -> Bitrate {
        let value = match self {
            QualityPreset::Low => "96k",
            QualityPreset::Medium => "128k",
            QualityPreset::High => "192k",
            QualityPreset::Ultra => "256k",
        };
        Bitrate(value.to_string())
    }

    fn speed(&self) -> EncoderSpeed {
        match self {
            QualityPreset::Low => EncoderSpeed::Fast,
            QualityPreset::Medium => EncoderSpeed::Medium,
            QualityPreset::High => EncoderSpeed::Slow,
            QualityPreset::Ultra => EncoderSpeed::Slower,
        }
    }
}

impl FromStr for QualityPreset {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(QualityPreset::Low),
            "medium" => Ok(QualityPreset::Medium),
            "high" => Ok(QualityPreset::High),
            "ultra" => Ok(QualityPreset::Ultra),
            _ => Err(MediaError::Validation(format!(
                "Invalid quality preset '{}'. Valid presets: low, medium, high, ultra",
                s
            ))),
        }
    }
}

/// x264/x265 `-preset` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderSpeed {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl EncoderSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderSpeed::Ultrafast => "ultrafast",
            EncoderSpeed::Superfast => "superfast",
            EncoderSpeed::Veryfast => "veryfast",
            EncoderSpeed::Faster => "faster",
            EncoderSpeed::Fast => "fast",
            EncoderSpeed::Medium => "medium",
            EncoderSpeed::Slow => "slow",
            EncoderSpeed::Slower => "slower",
            EncoderSpeed::Veryslow => "veryslow",
        }
    }
}

impl FromStr for EncoderSpeed {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        let speed = match s.trim().to_lowercase().as_str() {
            "ultrafast" => EncoderSpeed::Ultrafast,
            "superfast" => EncoderSpeed::Superfast,
            "veryfast" => EncoderSpeed::Veryfast,
            "faster" => EncoderSpeed::Faster,
            "fast" => EncoderSpeed::Fast,
            "medium" => EncoderSpeed::Medium,
            "slow" => EncoderSpeed::Slow,
            "slower" => EncoderSpeed::Slower,
            "veryslow" => EncoderSpeed::Veryslow,
            _ => {
                return Err(MediaError::Validation(format!(
                    "Invalid encoder speed '{}'. Valid speeds: ultrafast, superfast, veryfast, faster, fast, medium, slow, slower, veryslow",
                    s
                )));
            }
        };
        Ok(speed)
    }
}

/// A bitrate in ffmpeg notation: `800000`, `192k`, `2.5M`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitrate(String);

impl Bitrate {
    pub fn from_bits_per_second(bps: u64) -> Self {
        if bps >= 1000 && bps % 1000 == 0 {
            Bitrate(format!("{}k", bps / 1000))
        } else {
            Bitrate(bps.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Bitrate {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        let invalid = || {
            MediaError::Validation(format!(
                "Invalid bitrate '{}'. Expected a positive number with optional k or M suffix",
                s
            ))
        };

        let number = value
            .strip_suffix(['k', 'K'])
            .or_else(|| value.strip_suffix('M'))
            .unwrap_or(value);

        if number.is_empty()
            || number.starts_with('.')
            || !number.bytes().all(|b| b.is_ascii_digit() || b == b'.')
            || number.matches('.').count() > 1
        {
            return Err(invalid());
        }

        let parsed: f64 = number.parse().map_err(|_| invalid())?;
        if parsed <= 0.0 {
            return Err(invalid());
        }

        Ok(Bitrate(value.replace('K', "k")))
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-facing quality knobs shared by every encoding command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityOptions {
    pub preset: Option<QualityPreset>,
    pub crf: Option<u8>,
    pub video_bitrate: Option<Bitrate>,
    pub audio_bitrate: Option<Bitrate>,
    pub speed: Option<EncoderSpeed>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateControl {
    ConstantQuality { flag: &'static str, value: u8 },
    Bitrate(Bitrate),
}

/// Quality settings after explicit values and preset defaults are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuality {
    pub codec: VideoCodec,
    pub rate: Option<RateControl>,
    pub speed: Option<EncoderSpeed>,
}

impl QualityOptions {
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            preset: Some(preset),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge explicit values with preset defaults for `codec`, validating ranges.
    pub fn resolve(&self, codec: VideoCodec) -> Result<ResolvedQuality> {
        if self.crf.is_some() && self.video_bitrate.is_some() {
            return Err(MediaError::Validation(
                "specify either a CRF or a video bitrate, not both".to_string(),
            ));
        }

        if codec == VideoCodec::Copy {
            if self.crf.is_some() || self.video_bitrate.is_some() || self.speed.is_some() {
                return Err(MediaError::Validation(
                    "quality settings cannot be combined with video stream copy".to_string(),
                ));
            }
            return Ok(ResolvedQuality { codec, rate: None, speed: None });
        }

        let scale = codec.quality_scale();

        let rate = if let Some(crf) = self.crf {
            let scale = scale.ok_or_else(|| {
                MediaError::Validation(format!(
                    "{} has no constant-quality mode; use a video bitrate instead",
                    codec
                ))
            })?;
            if crf > scale.max {
                return Err(MediaError::Validation(format!(
                    "CRF {} is out of range for {} (0-{})",
                    crf, codec, scale.max
                )));
            }
            Some(RateControl::ConstantQuality { flag: scale.flag, value: crf })
        } else if let Some(bitrate) = &self.video_bitrate {
            Some(RateControl::Bitrate(bitrate.clone()))
        } else {
            self.preset.map(|preset| match scale {
                Some(scale) => RateControl::ConstantQuality {
                    flag: scale.flag,
                    value: preset.crf_for(scale.max),
                },
                None => RateControl::Bitrate(preset.video_bitrate()),
            })
        };

        let speed = match self.speed {
            Some(speed) if !codec.supports_speed_preset() => {
                return Err(MediaError::Validation(format!(
                    "encoder speed '{}' is not supported by {}",
                    speed.as_str(),
                    codec
                )));
            }
            Some(speed) => Some(speed),
            None if codec.supports_speed_preset() => self.preset.map(|preset| preset.speed()),
            None => None,
        };

        Ok(ResolvedQuality { codec, rate, speed })
    }

    /// Audio bitrate: explicit value first, then the preset's, only for codecs that take one.
    pub fn resolve_audio(&self, codec: AudioCodec) -> Result<Option<Bitrate>> {
        if !codec.accepts_bitrate() {
            if self.audio_bitrate.is_some() {
                return Err(MediaError::Validation(format!(
                    "audio codec {} does not take a bitrate",
                    codec
                )));
            }
            return Ok(None);
        }
        Ok(self
            .audio_bitrate
            .clone()
            .or_else(|| self.preset.map(|preset| preset.audio_bitrate())))
    }
}

impl ResolvedQuality {
    /// Codec-stage tokens: `-c:v`, rate control, speed preset.
    pub fn video_args(&self) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.codec.encoder().to_string()];
        match &self.rate {
            Some(RateControl::ConstantQuality { flag, value }) => {
                args.push(flag.to_string());
                args.push(value.to_string());
                // libvpx-vp9 only honours CRF in constrained mode with a zero target.
                if self.codec == VideoCodec::Vp9 {
                    args.push("-b:v".to_string());
                    args.push("0".to_string());
                }
            }
            Some(RateControl::Bitrate(bitrate)) => {
                args.push("-b:v".to_string());
                args.push(bitrate.to_string());
            }
            None => {}
        }
        if let Some(speed) = self.speed {
            args.push("-preset".to_string());
            args.push(speed.as_str().to_string());
        }
        args
    }
}

/// Tokens for `-c:a` plus an optional `-b:a`.
pub fn audio_args(codec: AudioCodec, bitrate: Option<&Bitrate>) -> Vec<String> {
    let mut args = vec!["-c:a".to_string(), codec.encoder().to_string()];
    if let Some(bitrate) = bitrate {
        args.push("-b:a".to_string());
        args.push(bitrate.to_string());
    }
    args
}
