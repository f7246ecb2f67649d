//! Media URL decoding
//!
//! Mirrors proxy origin media through their own `/pic` and `/video` routes.
//! Depending on the mirror, the origin URL is either percent-encoded into the
//! path or base64-encoded after an `/enc/` segment.

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use scraper::Html;

/// Origin host for images and avatars
const MEDIA_HOST: &str = "https://pbs.twimg.com";

/// How a mirror encodes proxied media paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaEncoding {
    /// Percent-encoded origin URL in the path
    #[default]
    Plain,
    /// Base64-encoded origin URL after `/enc/`
    Encrypted,
}

impl MediaEncoding {
    /// Detects the encoding used on a page from its avatar images
    pub fn detect(document: &Html) -> Self {
        let Ok(selector) = scraper::Selector::parse("img.avatar, a.profile-card-avatar img")
        else {
            return Self::Plain;
        };

        let encrypted = document
            .select(&selector)
            .filter_map(|img| img.value().attr("src"))
            .any(|src| src.contains("/enc/"));

        if encrypted {
            Self::Encrypted
        } else {
            Self::Plain
        }
    }
}

/// Decodes a base64 path segment, accepting both alphabets
pub fn decode_segment(segment: &str) -> Option<String> {
    let segment = segment.trim();
    let bytes = URL_SAFE
        .decode(segment)
        .or_else(|_| URL_SAFE_NO_PAD.decode(segment))
        .or_else(|_| STANDARD.decode(segment))
        .ok()?;
    String::from_utf8(bytes).ok()
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

fn strip_query(value: &str) -> &str {
    value.split('?').next().unwrap_or(value)
}

/// Decodes an attached picture's `src` into its origin URL
pub fn decode_picture(src: &str, encoding: MediaEncoding) -> Option<String> {
    match encoding {
        MediaEncoding::Encrypted => {
            let decoded = decode_segment(last_segment(src))?;
            Some(format!(
                "{}/{}",
                MEDIA_HOST,
                strip_query(decoded.trim_start_matches('/'))
            ))
        }
        MediaEncoding::Plain => {
            let (_, rest) = src.split_once("/pic")?;
            let decoded = percent_decode(rest);
            Some(format!("{}{}", MEDIA_HOST, strip_query(&decoded)))
        }
    }
}

/// Decodes a video's `data-url` into its origin URL
pub fn decode_video(data_url: &str, encoding: MediaEncoding) -> Option<String> {
    match encoding {
        MediaEncoding::Encrypted => decode_segment(last_segment(data_url)),
        MediaEncoding::Plain => {
            let (_, rest) = data_url.split_once("https")?;
            Some(percent_decode(&format!("https{}", rest)))
        }
    }
}

/// Decodes an animated gif's `<source src>` into its origin URL
pub fn decode_gif(src: &str, encoding: MediaEncoding) -> Option<String> {
    match encoding {
        MediaEncoding::Encrypted => {
            let decoded = decode_segment(last_segment(src))?;
            Some(format!("https://{}", decoded.trim_start_matches("https://")))
        }
        MediaEncoding::Plain => {
            let (_, rest) = src.split_once("/pic/")?;
            Some(percent_decode(&format!("https://{}", rest)))
        }
    }
}

/// Decodes a post author's avatar `src` into its origin URL
pub fn decode_avatar(src: &str, encoding: MediaEncoding) -> Option<String> {
    match encoding {
        MediaEncoding::Encrypted => {
            let decoded = decode_segment(last_segment(src))?;
            Some(format!("{}/{}", MEDIA_HOST, decoded.trim_start_matches('/')))
        }
        MediaEncoding::Plain => {
            let (_, rest) = src.split_once("/pic")?;
            Some(format!("{}{}", MEDIA_HOST, percent_decode(rest)))
        }
    }
}
