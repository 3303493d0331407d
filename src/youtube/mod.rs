pub mod clients;
pub mod extractor;

/// Canonical watch-page URL for a media identifier. External resolution
/// services take this form rather than a bare ID.
pub fn watch_url(media_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", media_id)
}
