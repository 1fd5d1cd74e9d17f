//! Media locator resolution.
//!
//! Tracks carry opaque locator strings. On desktop they are either local
//! files (`file://` URLs or bare paths) or remote `http(s)://` URLs.

use bridge_traits::error::{BridgeError, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaLocator {
    Local(PathBuf),
    Remote(String),
}

impl MediaLocator {
    /// Classify `locator`.
    ///
    /// Blank locators and unknown URL schemes are rejected as
    /// [`BridgeError::SourceUnavailable`].
    pub fn parse(locator: &str) -> Result<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(BridgeError::SourceUnavailable(
                "empty media locator".to_string(),
            ));
        }

        let Some((scheme, rest)) = locator.split_once("://") else {
            return Ok(MediaLocator::Local(PathBuf::from(locator)));
        };

        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Ok(MediaLocator::Remote(locator.to_string())),
            "file" => {
                // file://localhost/x and file:///x both name /x
                let path = rest.strip_prefix("localhost").unwrap_or(rest);
                if path.is_empty() {
                    return Err(BridgeError::SourceUnavailable(format!(
                        "file locator without path: {locator}"
                    )));
                }
                Ok(MediaLocator::Local(PathBuf::from(path)))
            }
            other => Err(BridgeError::SourceUnavailable(format!(
                "unsupported locator scheme: {other}"
            ))),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, MediaLocator::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_urls_and_bare_paths() {
        assert_eq!(
            MediaLocator::parse("file:///music/a.mp3").unwrap(),
            MediaLocator::Local(PathBuf::from("/music/a.mp3"))
        );
        assert_eq!(
            MediaLocator::parse("file://localhost/music/a.mp3").unwrap(),
            MediaLocator::Local(PathBuf::from("/music/a.mp3"))
        );
        assert_eq!(
            MediaLocator::parse("  relative/b.flac ").unwrap(),
            MediaLocator::Local(PathBuf::from("relative/b.flac"))
        );
    }

    #[test]
    fn test_remote_urls_keep_query() {
        let locator = MediaLocator::parse("HTTPS://cdn.test/p.mp3?hdnea=token").unwrap();
        assert!(locator.is_remote());
        assert_eq!(
            locator,
            MediaLocator::Remote("HTTPS://cdn.test/p.mp3?hdnea=token".to_string())
        );
    }

    #[test]
    fn test_rejects_blank_and_unknown_schemes() {
        assert!(matches!(
            MediaLocator::parse("   "),
            Err(BridgeError::SourceUnavailable(_))
        ));
        assert!(matches!(
            MediaLocator::parse("spotify://track/1"),
            Err(BridgeError::SourceUnavailable(_))
        ));
        assert!(matches!(
            MediaLocator::parse("file://"),
            Err(BridgeError::SourceUnavailable(_))
        ));
    }
}
