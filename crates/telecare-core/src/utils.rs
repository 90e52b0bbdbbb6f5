//! Utility functions for the Telecare admin client

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Base every normalized embed link starts with
pub const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed/";

const INVALID_URL_MESSAGE: &str =
    "Invalid YouTube URL. Please use: watch URL, short link (youtu.be), or embed URL";

struct YoutubePatterns {
    watch: Regex,
    short: Regex,
    embed: Regex,
    bare_id: Regex,
    canonical_embed: Regex,
    nocookie_embed: Regex,
    embed_id: Regex,
}

impl YoutubePatterns {
    fn compile() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            watch: Regex::new(r"(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([a-zA-Z0-9_-]{11})")?,
            short: Regex::new(r"(?:https?://)?youtu\.be/([a-zA-Z0-9_-]{11})")?,
            embed: Regex::new(
                r"(?:https?://)?(?:www\.)?youtube(?:-nocookie)?\.com/embed/([a-zA-Z0-9_-]{11})",
            )?,
            bare_id: Regex::new(r"([a-zA-Z0-9_-]{11})")?,
            canonical_embed: Regex::new(r"^https://www\.youtube\.com/embed/([a-zA-Z0-9_-]{11})$")?,
            nocookie_embed: Regex::new(
                r"^https://www\.youtube-nocookie\.com/embed/([a-zA-Z0-9_-]{11})$",
            )?,
            embed_id: Regex::new(r"embed/([a-zA-Z0-9_-]{11})")?,
        })
    }
}

static PATTERNS: LazyLock<std::result::Result<YoutubePatterns, regex::Error>> =
    LazyLock::new(YoutubePatterns::compile);

fn patterns() -> Result<&'static YoutubePatterns> {
    PATTERNS
        .as_ref()
        .map_err(|e| Error::Other(format!("YouTube patterns failed to compile: {e}")))
}

/// A YouTube video resolved to its canonical embed form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeVideo {
    /// 11 character video id
    pub video_id: String,
    /// `https://www.youtube.com/embed/<id>`
    pub embed_link: String,
}

impl YoutubeVideo {
    fn from_id(id: &str) -> Self {
        Self {
            video_id: id.to_string(),
            embed_link: format!("{YOUTUBE_EMBED_BASE}{id}"),
        }
    }
}

/// Convert a watch URL, short link or embed URL to the canonical embed link
///
/// Recognized forms are tried in order: `youtube.com/watch?v=`, `youtu.be/`,
/// `youtube(-nocookie).com/embed/`. If none match, the first 11 character run
/// of id characters anywhere in the input is taken as the id.
pub fn convert_youtube_url(url: &str) -> Result<YoutubeVideo> {
    if url.is_empty() {
        return Err(Error::validation("url", "URL must be a non-empty string"));
    }

    let trimmed = url.trim();
    let patterns = patterns()?;

    [&patterns.watch, &patterns.short, &patterns.embed, &patterns.bare_id]
        .into_iter()
        .find_map(|pattern| pattern.captures(trimmed))
        .and_then(|captures| captures.get(1))
        .map(|id| YoutubeVideo::from_id(id.as_str()))
        .ok_or_else(|| Error::validation("url", INVALID_URL_MESSAGE))
}

/// True for an exact `www.youtube.com` or `www.youtube-nocookie.com` embed link
pub fn is_valid_embed_link(embed_link: &str) -> bool {
    let Ok(patterns) = patterns() else {
        return false;
    };
    let candidate = embed_link.trim();
    patterns.canonical_embed.is_match(candidate) || patterns.nocookie_embed.is_match(candidate)
}

/// Pull the video id out of anything containing `embed/<id>`
pub fn extract_video_id_from_embed_link(embed_link: &str) -> Option<String> {
    patterns()
        .ok()?
        .embed_id
        .captures(embed_link)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ")]
    #[case("youtube.com/watch?v=dQw4w9WgXcQ&t=42s", "dQw4w9WgXcQ")]
    #[case("https://youtu.be/dQw4w9WgXcQ?si=abcdef", "dQw4w9WgXcQ")]
    #[case("https://www.youtube.com/embed/dQw4w9WgXcQ?si=xyz", "dQw4w9WgXcQ")]
    #[case("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ", "dQw4w9WgXcQ")]
    #[case("  dQw4w9WgXcQ  ", "dQw4w9WgXcQ")]
    #[case("https://m.youtube.com/shorts/abc_DEF-123", "abc_DEF-123")]
    fn test_convert_youtube_url(#[case] input: &str, #[case] expected_id: &str) {
        let video = convert_youtube_url(input).unwrap();
        assert_eq!(video.video_id, expected_id);
        assert_eq!(
            video.embed_link,
            format!("https://www.youtube.com/embed/{expected_id}")
        );
        assert!(is_valid_embed_link(&video.embed_link));
    }

    #[test]
    fn test_convert_youtube_url_empty() {
        let error = convert_youtube_url("").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Validation error: url - URL must be a non-empty string"
        );
    }

    #[rstest]
    #[case("   ")]
    #[case("https://vimeo.com/1234")]
    #[case("not a video")]
    fn test_convert_youtube_url_invalid(#[case] input: &str) {
        let error = convert_youtube_url(input).unwrap_err();
        assert!(error.to_string().contains("Invalid YouTube URL"));
    }

    #[rstest]
    #[case("https://www.youtube.com/embed/dQw4w9WgXcQ", true)]
    #[case(" https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ ", true)]
    #[case("http://www.youtube.com/embed/dQw4w9WgXcQ", false)]
    #[case("https://youtube.com/embed/dQw4w9WgXcQ", false)]
    #[case("https://www.youtube.com/embed/dQw4w9WgXcQ?si=1", false)]
    #[case("https://www.youtube.com/watch?v=dQw4w9WgXcQ", false)]
    #[case("", false)]
    fn test_is_valid_embed_link(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_valid_embed_link(input), expected);
    }

    #[test]
    fn test_extract_video_id_from_embed_link() {
        assert_eq!(
            extract_video_id_from_embed_link("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id_from_embed_link("https://youtu.be/dQw4w9WgXcQ"),
            None
        );
        assert_eq!(extract_video_id_from_embed_link(""), None);
    }
}
