//! Archive request model
//!
//! JSON shapes accepted by `POST /archive` and the validated content source
//! derived from them.

use serde::Deserialize;
use std::fmt;

/// Body of an archive request
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRequest {
    /// Page to fetch and archive
    #[serde(default)]
    pub url: Option<String>,
    /// Literal HTML piped to the tool on stdin
    #[serde(default)]
    pub stdin_html: Option<String>,
    #[serde(default)]
    pub options: ArchiveOptions,
}

/// Feature toggles and values forwarded to the archiving tool
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ArchiveOptions {
    pub exclude_audio: bool,
    pub exclude_css: bool,
    pub exclude_images: bool,
    pub exclude_js: bool,
    pub exclude_fonts: bool,
    pub exclude_videos: bool,
    pub omit_frames: bool,
    pub isolate: bool,
    pub extract_no_script: bool,
    pub mhtml: bool,
    pub no_metadata: bool,
    pub ignore_network_errors: bool,
    pub accept_invalid_certs: bool,
    pub quiet: bool,
    /// Per-fetch timeout, enforced by the tool itself
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
    pub base_url: Option<String>,
    pub cookies_file: Option<String>,
    pub encoding: Option<String>,
    pub allow_domains: Vec<String>,
    pub block_domains: Vec<String>,
}

/// Where the document to archive comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Url(String),
    Html(String),
}

/// Reasons a request is rejected before any process is started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingSource,
    FlagLikeUrl(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSource => write!(f, "Either 'url' or 'stdinHtml' must be provided"),
            Self::FlagLikeUrl(url) => write!(f, "URL must not start with '-': {url}"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ArchiveRequest {
    /// Pick the content source; a non-blank URL wins over inline HTML.
    /// The URL is trimmed before it is checked and passed on.
    pub fn content_source(&self) -> Result<ContentSource, ValidationError> {
        if let Some(url) = non_blank(self.url.as_deref()).map(str::trim) {
            if url.starts_with('-') {
                return Err(ValidationError::FlagLikeUrl(url.to_string()));
            }
            return Ok(ContentSource::Url(url.to_string()));
        }

        non_blank(self.stdin_html.as_deref())
            .map(|html| ContentSource::Html(html.to_string()))
            .ok_or(ValidationError::MissingSource)
    }
}

impl ContentSource {
    /// Text to feed the process on stdin, if any
    pub fn stdin_input(&self) -> Option<&str> {
        match self {
            Self::Html(html) => Some(html),
            Self::Url(_) => None,
        }
    }

    /// Short label for log lines
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Html(html) => format!("<stdin: {} bytes>", html.len()),
        }
    }
}

/// `Some(s)` when `s` has at least one non-whitespace character
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
