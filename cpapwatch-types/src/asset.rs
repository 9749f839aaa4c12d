//! Asset path normalization.

/// Host serving device and mask images.
pub const ASSET_BASE_URL: &str = "https://static.myair-prd.dht.live/";

/// Rewrite a relative image path into an absolute asset URL.
///
/// Empty paths and paths that are already `https://` URLs pass through
/// unchanged, so normalizing twice is a no-op.
///
/// ```rust
/// use cpapwatch_types::normalize_image_path;
///
/// assert_eq!(
///     normalize_image_path("v1/masks/f20.jpg"),
///     "https://static.myair-prd.dht.live/v1/masks/f20.jpg"
/// );
/// ```
pub fn normalize_image_path(path: &str) -> String {
    if path.is_empty() || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}{}", ASSET_BASE_URL, path.trim_start_matches('/'))
}
