use std::fmt;
use std::path::Path;

/// Ordered command-line tokens for one tool invocation.
///
/// Token order is significant for ffmpeg (an option applies to the next
/// input or output that follows it), so the list is only ever produced by
/// [`ArgumentBuilder::build`] and cannot be modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentList {
    tokens: Vec<String>,
}

impl ArgumentList {
    /// Arguments that do not follow the input/output grammar (probe and query calls).
    pub fn raw<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(|s| s.into()).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Index of the first occurrence of `token`.
    pub fn position(&self, token: &str) -> Option<usize> {
        self.tokens.iter().position(|t| t == token)
    }

    /// Value following the first occurrence of `flag`.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.position(flag)
            .and_then(|index| self.tokens.get(index + 1))
            .map(|value| value.as_str())
    }

    /// Values following every occurrence of `flag`, in order.
    pub fn values_of(&self, flag: &str) -> Vec<&str> {
        self.tokens
            .windows(2)
            .filter(|pair| pair[0] == flag)
            .map(|pair| pair[1].as_str())
            .collect()
    }

    /// The final token, which for ffmpeg is the output path.
    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(|t| t.as_str())
    }
}

impl fmt::Display for ArgumentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .tokens
            .iter()
            .map(|token| {
                if token.is_empty() || token.contains(char::is_whitespace) {
                    format!("{:?}", token)
                } else {
                    token.clone()
                }
            })
            .collect();
        f.write_str(&rendered.join(" "))
    }
}

/// One `-i` input together with the options that must precede it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    options: Vec<String>,
    path: String,
}

impl InputSpec {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            options: Vec::new(),
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    /// Option placed before `-i` (demuxer selection, fast seek, ...).
    pub fn option<S: Into<String>>(mut self, option: S) -> Self {
        self.options.push(option.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(|s| s.into()));
        self
    }

    /// Seek before opening the input: fast, keyframe-granular.
    pub fn seek(self, position: &str) -> Self {
        self.option("-ss").option(position)
    }

    pub fn format<S: Into<String>>(self, format: S) -> Self {
        self.option("-f").option(format)
    }
}

/// Ffmpeg command builder with named stages.
///
/// Stages are emitted in a fixed order no matter in which order they were
/// filled: global, inputs (each with its pre-input options), post-input,
/// filters, mappings, codecs, metadata, output options, output path.
#[derive(Debug, Clone, Default)]
pub struct ArgumentBuilder {
    global: Vec<String>,
    inputs: Vec<InputSpec>,
    post_input: Vec<String>,
    filters: Vec<String>,
    mappings: Vec<String>,
    codecs: Vec<String>,
    metadata: Vec<String>,
    output_options: Vec<String>,
}

impl ArgumentBuilder {
    /// Builder pre-filled with the global options every ffmpeg call uses.
    /// Staged outputs are always fresh paths, so `-y` never clobbers user data.
    pub fn ffmpeg() -> Self {
        Self::default().global(["-hide_banner", "-nostdin", "-y"])
    }

    pub fn global<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global.extend(options.into_iter().map(|s| s.into()));
        self
    }

    pub fn input(mut self, input: InputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    /// Shorthand for an input without pre-input options.
    pub fn input_path<P: AsRef<Path>>(self, path: P) -> Self {
        self.input(InputSpec::new(path))
    }

    /// Options placed after every input: accurate seek, duration limits.
    pub fn post_input<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_input.extend(options.into_iter().map(|s| s.into()));
        self
    }

    /// Seek after opening the input: decodes up to the position, frame accurate.
    pub fn accurate_seek(self, position: &str) -> Self {
        self.post_input(["-ss", position])
    }

    pub fn duration(self, duration: &str) -> Self {
        self.post_input(["-t", duration])
    }

    pub fn video_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.filters.push("-vf".to_string());
        self.filters.push(filter.into());
        self
    }

    pub fn filter_complex<S: Into<String>>(mut self, graph: S) -> Self {
        self.filters.push("-filter_complex".to_string());
        self.filters.push(graph.into());
        self
    }

    pub fn map<S: Into<String>>(mut self, specifier: S) -> Self {
        self.mappings.push("-map".to_string());
        self.mappings.push(specifier.into());
        self
    }

    pub fn mapping<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mappings.extend(options.into_iter().map(|s| s.into()));
        self
    }

    pub fn codec<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codecs.extend(options.into_iter().map(|s| s.into()));
        self
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.codec(["-c:v".to_string(), codec.into()])
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.codec(["-c:a".to_string(), codec.into()])
    }

    pub fn copy_all(self) -> Self {
        self.codec(["-c", "copy"])
    }

    pub fn no_video(self) -> Self {
        self.codec(["-vn"])
    }

    pub fn no_audio(self) -> Self {
        self.codec(["-an"])
    }

    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.push("-metadata".to_string());
        self.metadata.push(format!("{}={}", key, value));
        self
    }

    /// Per-stream metadata, e.g. `s:s:0` for the first subtitle stream.
    pub fn stream_metadata(mut self, specifier: &str, key: &str, value: &str) -> Self {
        self.metadata.push(format!("-metadata:{}", specifier));
        self.metadata.push(format!("{}={}", key, value));
        self
    }

    pub fn output_option<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_options.extend(options.into_iter().map(|s| s.into()));
        self
    }

    /// Assemble the final list, ending with `output`.
    pub fn build<P: AsRef<Path>>(self, output: P) -> ArgumentList {
        let mut tokens = self.global;
        for input in self.inputs {
            tokens.extend(input.options);
            tokens.push("-i".to_string());
            tokens.push(input.path);
        }
        tokens.extend(self.post_input);
        tokens.extend(self.filters);
        tokens.extend(self.mappings);
        tokens.extend(self.codecs);
        tokens.extend(self.metadata);
        tokens.extend(self.output_options);
        tokens.push(output.as_ref().to_string_lossy().to_string());

        ArgumentList { tokens }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_fixed() {
        // Filled deliberately out of order.
        let args = ArgumentBuilder::ffmpeg()
            .output_option(["-movflags", "+faststart"])
            .metadata("title", "Demo")
            .video_codec("libx264")
            .map("0:v")
            .video_filter("scale=640:-2")
            .duration("5")
            .input(InputSpec::new("in.mp4").seek("3"))
            .build("out.mp4");

        assert_eq!(
            args.tokens(),
            [
                "-hide_banner", "-nostdin", "-y",
                "-ss", "3", "-i", "in.mp4",
                "-t", "5",
                "-vf", "scale=640:-2",
                "-map", "0:v",
                "-c:v", "libx264",
                "-metadata", "title=Demo",
                "-movflags", "+faststart",
                "out.mp4",
            ]
        );
    }

    #[test]
    fn test_pre_input_options_stay_with_their_input() {
        let args = ArgumentBuilder::ffmpeg()
            .input_path("a.mp4")
            .input(InputSpec::new("list.txt").format("concat").options(["-safe", "0"]))
            .build("out.mkv");

        let inputs = args.values_of("-i");
        assert_eq!(inputs, vec!["a.mp4", "list.txt"]);
        let concat = args.position("concat").unwrap();
        assert!(concat > args.position("a.mp4").unwrap());
        assert!(concat < args.position("list.txt").unwrap());
    }

    #[test]
    fn test_accessors() {
        let args = ArgumentList::raw(["-v", "error", "-show_format", "file name.mp4"]);
        assert_eq!(args.value_of("-v"), Some("error"));
        assert_eq!(args.last(), Some("file name.mp4"));
        assert_eq!(args.to_string(), "-v error -show_format \"file name.mp4\"");
        assert!(!args.contains("-y"));
    }
}
