//! Recovery from stale cached downloads
//!
//! brew reports a corrupted or stale cached download as a sha256 checksum
//! mismatch and names the offending cache files in `Already downloaded:`
//! lines. Deleting those files and retrying the install once is the
//! documented workaround.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::ProviderError;

const CHECKSUM_SIGNATURE: &str = "sha256 checksum";

static ALREADY_DOWNLOADED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Already downloaded: (.*)").unwrap());

/// Cache files implicated in a checksum failure, when the install output
/// carries the mismatch signature together with at least one
/// `Already downloaded:` line.
pub fn detect(output: &str) -> Option<Vec<PathBuf>> {
    if !output.contains(CHECKSUM_SIGNATURE) {
        return None;
    }
    let paths: Vec<PathBuf> = ALREADY_DOWNLOADED
        .captures_iter(output)
        .map(|caps| PathBuf::from(caps[1].trim()))
        .collect();
    if paths.is_empty() {
        None
    } else {
        Some(paths)
    }
}

/// Delete the implicated cache files. A file that is already gone is fine;
/// the attempt still counts as failed and the caller owns the single retry.
pub async fn scrub(paths: &[PathBuf]) -> Result<(), ProviderError> {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed mismatched checksum file {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Could not remove mismatched checksum file {}: already gone",
                    path.display()
                );
            }
            Err(e) => {
                return Err(ProviderError::ChecksumScrubFailed {
                    path: path.display().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_single_cache_file() {
        let output = "Error: wget: sha256 checksum mismatch\nAlready downloaded: /tmp/a.tar.gz\n";
        assert_eq!(
            detect(output),
            Some(vec![PathBuf::from("/tmp/a.tar.gz")])
        );
    }

    #[test]
    fn detects_every_implicated_file() {
        let output = "sha256 checksum mismatch\nAlready downloaded: /tmp/a.tar.gz\nAlready downloaded: /tmp/b.tar.gz\n";
        assert_eq!(
            detect(output),
            Some(vec![
                PathBuf::from("/tmp/a.tar.gz"),
                PathBuf::from("/tmp/b.tar.gz"),
            ])
        );
    }

    #[test]
    fn no_signature_means_no_detection() {
        assert_eq!(detect("Already downloaded: /tmp/a.tar.gz\n"), None);
    }

    #[test]
    fn signature_without_paths_means_no_detection() {
        assert_eq!(detect("sha256 checksum mismatch\n"), None);
    }

    #[tokio::test]
    async fn scrub_tolerates_missing_files() {
        let paths = vec![PathBuf::from("/nonexistent/homebrew-cache/a.tar.gz")];
        assert!(scrub(&paths).await.is_ok());
    }

    #[tokio::test]
    async fn scrub_deletes_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("a.tar.gz");
        tokio::fs::write(&cached, b"stale").await.unwrap();

        scrub(&[cached.clone()]).await.unwrap();
        assert!(!cached.exists());
    }
}
