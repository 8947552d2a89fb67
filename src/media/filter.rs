//! Escaping for values embedded in ffmpeg filter graphs.
//!
//! A value inside a graph is parsed twice: once when the graph is split into
//! filters and once when a filter's `key=value` options are split. Each pass
//! has its own special characters, so values are escaped for the option
//! level first and for the graph level second.

/// Escape a single filter option value (`\`, `'` and `:`).
pub fn escape_option_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '\'' | ':') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Escape text for the filter-graph level (`\`, `'`, `[`, `]`, `,`, `;`).
pub fn escape_graph(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '\'' | '[' | ']' | ',' | ';') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Both levels, for a value that ends up inside `-vf` / `-filter_complex`.
pub fn escape_filter_value(value: &str) -> String {
    escape_graph(&escape_option_value(value))
}

/// Escape a path for use as a filter option such as `subtitles=filename=...`.
/// Windows separators are normalised to `/`, which libavfilter accepts.
pub fn escape_filter_path(path: &std::path::Path) -> String {
    let rendered = path.to_string_lossy();
    let normalized = if cfg!(windows) {
        rendered.replace('\\', "/")
    } else {
        rendered.to_string()
    };
    escape_filter_value(&normalized)
}

/// A comma-separated filter chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>>(mut self, filter: S) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn render(&self) -> String {
        self.filters.join(",")
    }
}
