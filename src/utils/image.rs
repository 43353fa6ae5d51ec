//! Turning an `--image` argument into something the API accepts.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

#[derive(Debug)]
pub enum ImageError {
    NotFound(PathBuf),
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::NotFound(path) => {
                write!(f, "image {} is neither a URL nor an existing file", path.display())
            }
            ImageError::Read { path, source } => {
                write!(f, "failed to read image {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ImageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageError::NotFound(_) => None,
            ImageError::Read { source, .. } => Some(source),
        }
    }
}

fn is_url(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
}

fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

/// URLs (including `data:` URLs) pass through untouched; a local file is
/// inlined as a base64 `data:` URL.
pub fn resolve_image_reference(reference: &str) -> Result<String, ImageError> {
    let reference = reference.trim();
    if is_url(reference) {
        return Ok(reference.to_string());
    }

    let path = Path::new(reference);
    if !path.is_file() {
        return Err(ImageError::NotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| ImageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(format!(
        "data:{};base64,{}",
        mime_type(path),
        STANDARD.encode(bytes)
    ))
}
