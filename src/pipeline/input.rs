//! Input resolution: classify a user-supplied image reference once and fetch
//! it to a local file when needed.
//!
//! ## Why classify up front?
//!
//! The same string travels from the CLI into the model request, the header
//! extractor and the thumbnail on the report's header page. Turning it into an
//! [`ImageSource`] at the edge means no downstream code re-sniffs
//! `http://` prefixes.
//!
//! ## Why download to a temp file?
//!
//! The layout engine embeds thumbnails from the file system and stays free of
//! network I/O. A remote image is therefore downloaded once into a `TempDir`
//! that lives exactly as long as the [`ResolvedImage`], and both the model
//! call and the report use that copy.

use crate::error::ReportError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Where the analysed image lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSource {
    /// A file on the local file system.
    LocalPath(PathBuf),
    /// An HTTP/HTTPS URL.
    RemoteUrl(String),
}

impl ImageSource {
    /// Classify a raw reference. Strings with an `http://` or `https://`
    /// scheme are URLs; everything else is treated as a path.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if is_url(input) {
            ImageSource::RemoteUrl(input.to_string())
        } else {
            ImageSource::LocalPath(PathBuf::from(input))
        }
    }

    /// File stem used when naming archived text reports.
    pub fn stem(&self) -> Option<String> {
        let name = match self {
            ImageSource::LocalPath(p) => p.file_stem()?.to_string_lossy().into_owned(),
            ImageSource::RemoteUrl(u) => {
                let last = url_last_segment(u)?;
                Path::new(&last).file_stem()?.to_string_lossy().into_owned()
            }
        };
        (!name.is_empty()).then_some(name)
    }
}

/// The fetched image: the caller's file or a downloaded temp file.
pub enum ResolvedImage {
    /// Input was already a local file.
    Local { source: ImageSource, path: PathBuf },
    /// Input was a URL; image downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded {
        source: ImageSource,
        path: PathBuf,
        _temp_dir: TempDir,
    },
}

impl ResolvedImage {
    /// Path to the image file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedImage::Local { path, .. } => path,
            ResolvedImage::Downloaded { path, .. } => path,
        }
    }

    /// The reference the caller originally gave.
    pub fn source(&self) -> &ImageSource {
        match self {
            ResolvedImage::Local { source, .. } => source,
            ResolvedImage::Downloaded { source, .. } => source,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Classify a raw image reference. Same as [`ImageSource::parse`].
pub fn resolve_image_source(input: &str) -> ImageSource {
    ImageSource::parse(input)
}

/// Make the image available as a local file.
///
/// URLs are downloaded into a temporary directory; local paths must exist.
pub async fn fetch_image(
    source: &ImageSource,
    timeout_secs: u64,
) -> Result<ResolvedImage, ReportError> {
    match source {
        ImageSource::RemoteUrl(url) => download_url(url, timeout_secs).await,
        ImageSource::LocalPath(path) => resolve_local(path),
    }
}

fn resolve_local(path: &Path) -> Result<ResolvedImage, ReportError> {
    if !path.is_file() {
        return Err(ReportError::InvalidImageSource {
            input: path.display().to_string(),
        });
    }
    debug!("Resolved local image: {}", path.display());
    Ok(ResolvedImage::Local {
        source: ImageSource::LocalPath(path.to_path_buf()),
        path: path.to_path_buf(),
    })
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedImage, ReportError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ReportError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ReportError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ReportError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ReportError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = url_last_segment(url)
        .filter(|s| s.contains('.'))
        .unwrap_or_else(|| "downloaded.png".to_string());

    let temp_dir = TempDir::new().map_err(|e| ReportError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ReportError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ReportError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedImage::Downloaded {
        source: ImageSource::RemoteUrl(url.to_string()),
        path: file_path,
        _temp_dir: temp_dir,
    })
}

fn url_last_segment(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty()).then(|| last.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/a.png"));
        assert!(is_url("http://example.com/a.png"));
        assert!(!is_url("/tmp/a.png"));
        assert!(!is_url("a.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn parse_classifies_once() {
        assert_eq!(
            ImageSource::parse(" https://x.org/flower.jpg "),
            ImageSource::RemoteUrl("https://x.org/flower.jpg".into())
        );
        assert_eq!(
            ImageSource::parse("output/flower.jpg"),
            ImageSource::LocalPath(PathBuf::from("output/flower.jpg"))
        );
    }

    #[test]
    fn resolve_image_source_trims_and_classifies() {
        assert_eq!(
            resolve_image_source("  https://x.org/a.png "),
            ImageSource::RemoteUrl("https://x.org/a.png".into())
        );
        assert_eq!(
            resolve_image_source("ftp://x.org/a.png"),
            ImageSource::LocalPath(PathBuf::from("ftp://x.org/a.png"))
        );
    }

    #[test]
    fn stem_from_path_and_url() {
        assert_eq!(
            ImageSource::parse("output/abc.png").stem().as_deref(),
            Some("abc")
        );
        assert_eq!(
            ImageSource::parse("https://x.org/img/mandala.jpeg?x=1").stem().as_deref(),
            Some("mandala")
        );
        assert_eq!(ImageSource::parse("https://x.org/").stem(), None);
    }

    #[tokio::test]
    async fn missing_local_file_is_rejected() {
        let src = ImageSource::parse("/definitely/not/here.png");
        let err = fetch_image(&src, 5).await.err().expect("should fail");
        assert!(matches!(err, ReportError::InvalidImageSource { .. }));
    }

    #[tokio::test]
    async fn existing_local_file_resolves_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let resolved = fetch_image(&ImageSource::LocalPath(path.clone()), 5)
            .await
            .unwrap();
        assert_eq!(resolved.path(), path.as_path());
        assert_eq!(resolved.source(), &ImageSource::LocalPath(path));
    }
}
