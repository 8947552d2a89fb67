use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{MediaError, Result};
use crate::media::{ArgumentBuilder, ArgumentList};
use crate::output::Outcome;
use crate::toolkit::{require_input, Toolkit};

/// Container-level tag names. Anything else goes through `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataKey {
    Title,
    Artist,
    Album,
    Date,
    Comment,
    Genre,
    Copyright,
    Description,
    Custom(String),
}

impl MetadataKey {
    pub fn as_str(&self) -> &str {
        match self {
            MetadataKey::Title => "title",
            MetadataKey::Artist => "artist",
            MetadataKey::Album => "album",
            MetadataKey::Date => "date",
            MetadataKey::Comment => "comment",
            MetadataKey::Genre => "genre",
            MetadataKey::Copyright => "copyright",
            MetadataKey::Description => "description",
            MetadataKey::Custom(key) => key,
        }
    }

    /// A key given by name: letters, digits, `_` and `-` only.
    /// Standard names (in any case) map to their own variant.
    pub fn custom(key: &str) -> Result<Self> {
        let key = key.trim();
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
            return Err(MediaError::Validation(format!(
                "invalid metadata key '{}': use letters, digits, '_' or '-'",
                key
            )));
        }
        Ok(Self::standard(key).unwrap_or_else(|| MetadataKey::Custom(key.to_string())))
    }

    fn standard(key: &str) -> Option<Self> {
        let key = match key.to_ascii_lowercase().as_str() {
            "title" => MetadataKey::Title,
            "artist" | "author" => MetadataKey::Artist,
            "album" => MetadataKey::Album,
            "date" | "year" => MetadataKey::Date,
            "comment" => MetadataKey::Comment,
            "genre" => MetadataKey::Genre,
            "copyright" => MetadataKey::Copyright,
            "description" => MetadataKey::Description,
            _ => return None,
        };
        Some(key)
    }
}

impl FromStr for MetadataKey {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        MetadataKey::custom(s)
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse `key=value`, as given on the command line.
pub fn parse_entry(entry: &str) -> Result<(MetadataKey, String)> {
    let (key, value) = entry.split_once('=').ok_or_else(|| {
        MediaError::Validation(format!("metadata entry '{}' is not key=value", entry))
    })?;
    Ok((key.parse()?, value.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct MetadataRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub entries: Vec<(MetadataKey, String)>,
    /// Drop every tag of the input before writing `entries`.
    pub clear_existing: bool,
    pub overwrite: bool,
}

impl MetadataRequest {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn entry<S: Into<String>>(mut self, key: MetadataKey, value: S) -> Self {
        self.entries.push((key, value.into()));
        self
    }
}

pub fn build_args(request: &MetadataRequest, input: &Path, output: &Path) -> Result<ArgumentList> {
    if request.entries.is_empty() && !request.clear_existing {
        return Err(MediaError::Validation(
            "nothing to change: give at least one entry or clear existing metadata".to_string(),
        ));
    }

    let mut builder = ArgumentBuilder::ffmpeg().input_path(input);
    if request.clear_existing {
        builder = builder.mapping(["-map_metadata", "-1"]);
    }
    builder = builder.map("0").copy_all();

    for (key, value) in &request.entries {
        builder = builder.metadata(key.as_str(), value);
    }

    Ok(builder.build(output))
}

impl Toolkit {
    /// Rewrite container tags, copying every stream unchanged.
    pub async fn set_metadata(&self, request: &MetadataRequest) -> Result<Outcome> {
        let input = require_input(&request.input)?;
        let staged = self.stage(&request.output, request.overwrite);
        let args = build_args(request, &input, staged.path())?;

        self.encode("Set metadata", staged, args).await
    }

    /// Container tags as reported by ffprobe.
    pub async fn show_metadata(&self, input: &Path) -> Result<BTreeMap<String, String>> {
        Ok(self.probe(input).await?.tags)
    }
}
