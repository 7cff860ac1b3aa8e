//! Loading of the fixed render-time assets.
//!
//! | Asset | Missing or undecodable |
//! |-------|------------------------|
//! | cover | fatal: [`ReportError::AssetMissing`] / [`ReportError::AssetUnreadable`] |
//! | background | fatal, same as cover |
//! | font | Helvetica + [`RenderWarning::FontFallback`] |
//! | thumbnail | fallback asset, else none + [`RenderWarning::ThumbnailUnavailable`] |
//!
//! Everything is loaded before any page is drawn, so a fatal asset error
//! never leaves a partial document behind.

use crate::config::AssetPaths;
use crate::error::{AssetKind, ReportError, RenderWarning};
use crate::layout::canvas::RasterImage;
use crate::layout::font::{EmbeddedFont, FontFace};
use crate::pipeline::input::ImageSource;
use std::path::Path;
use tracing::{debug, warn};

/// Assets ready for the layout engine.
pub struct LoadedAssets {
    pub cover: RasterImage,
    pub background: RasterImage,
    pub thumbnail: Option<RasterImage>,
    pub font: FontFace,
    pub warnings: Vec<RenderWarning>,
}

/// Load every asset, choosing the thumbnail from `user_image` first.
pub fn load_assets(
    paths: &AssetPaths,
    user_image: Option<&ImageSource>,
) -> Result<LoadedAssets, ReportError> {
    let cover = load_required(AssetKind::Cover, &paths.cover)?;
    let background = load_required(AssetKind::Background, &paths.background)?;

    let mut warnings = Vec::new();
    let font = load_font(&paths.font, &mut warnings);
    let thumbnail = resolve_thumbnail(user_image, &paths.fallback_thumbnail, &mut warnings);

    Ok(LoadedAssets {
        cover,
        background,
        thumbnail,
        font,
        warnings,
    })
}

fn load_required(asset: AssetKind, path: &Path) -> Result<RasterImage, ReportError> {
    if !path.is_file() {
        return Err(ReportError::AssetMissing {
            asset,
            path: path.to_path_buf(),
        });
    }
    let bytes = std::fs::read(path).map_err(|e| ReportError::AssetUnreadable {
        asset,
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let image = RasterImage::decode(&bytes).map_err(|e| ReportError::AssetUnreadable {
        asset,
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    debug!("Loaded {} {}×{}", asset, image.width, image.height);
    Ok(image)
}

/// The embedded CJK font, or Helvetica with a warning.
pub fn load_font(path: &Path, warnings: &mut Vec<RenderWarning>) -> FontFace {
    match EmbeddedFont::open(path) {
        Ok(font) => {
            debug!("Loaded font {}", path.display());
            FontFace::Embedded(Box::new(font))
        }
        Err(detail) => {
            let w = RenderWarning::FontFallback {
                path: path.to_path_buf(),
                detail,
            };
            warn!("{}", w);
            warnings.push(w);
            FontFace::Helvetica
        }
    }
}

/// User image if it is a readable local file, else the fallback asset.
///
/// Remote URLs are not fetched here; callers that want them shown download
/// them first and pass the local copy.
pub fn resolve_thumbnail(
    user_image: Option<&ImageSource>,
    fallback: &Path,
    warnings: &mut Vec<RenderWarning>,
) -> Option<RasterImage> {
    if let Some(source) = user_image {
        match source {
            ImageSource::LocalPath(path) => match decode_file(path) {
                Ok(img) => return Some(img),
                Err(e) => debug!("User image {} unusable: {}", path.display(), e),
            },
            ImageSource::RemoteUrl(url) => {
                debug!("Not fetching remote thumbnail {}; using fallback", url)
            }
        }
    }

    match decode_file(fallback) {
        Ok(img) => Some(img),
        Err(detail) => {
            let w = RenderWarning::ThumbnailUnavailable {
                detail: format!("{}: {}", fallback.display(), detail),
            };
            warn!("{}", w);
            warnings.push(w);
            None
        }
    }
}

fn decode_file(path: &Path) -> Result<RasterImage, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    RasterImage::decode(&bytes).map_err(|e| e.to_string())
}
