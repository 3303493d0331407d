use serde_json::Value;
use thiserror::Error;

/// A playable format pulled out of a player response.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedStream {
    pub url: String,
    pub ext: String,
    pub bitrate: Option<i64>,
    pub duration: Option<u64>,
    pub title: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    /// Explicit non-OK playability. Strategy-terminal; the chain advances.
    #[error("not playable: {0}")]
    NotPlayable(String),
    /// Upstream content-protection rejection. No strategy can retry this.
    #[error("content protection: {0}")]
    Protected(String),
    /// A 200 response without a single usable audio format.
    #[error("no usable audio format in player response")]
    NoAudioFormat,
}

/// Pull the best audio stream out of an InnerTube player response.
///
/// Playability is checked before any format is touched. Selection order:
/// highest-bitrate audio-only format, falling back to any format that
/// carries an audio codec. A missing bitrate sorts as 0.
pub fn extract_stream(player: &Value) -> Result<ExtractedStream, ExtractError> {
    let status = player
        .get("playabilityStatus")
        .and_then(|p| p.get("status"))
        .and_then(|s| s.as_str())
        .unwrap_or("UNKNOWN");

    if status != "OK" {
        let reason = player
            .get("playabilityStatus")
            .and_then(|p| p.get("reason"))
            .and_then(|r| r.as_str())
            .unwrap_or("no reason provided");

        if is_protection(status, reason) {
            return Err(ExtractError::Protected(format!("{}: {}", status, reason)));
        }
        return Err(ExtractError::NotPlayable(format!("{}: {}", status, reason)));
    }

    let streaming_data = player
        .get("streamingData")
        .ok_or(ExtractError::NoAudioFormat)?;

    let adaptive = streaming_data
        .get("adaptiveFormats")
        .and_then(|v| v.as_array());
    let formats = streaming_data.get("formats").and_then(|v| v.as_array());

    let best = select_best_audio_format(adaptive, formats).ok_or(ExtractError::NoAudioFormat)?;

    // Candidates are pre-filtered on a plain `url` field, so this holds.
    let url = best
        .get("url")
        .and_then(|u| u.as_str())
        .ok_or(ExtractError::NoAudioFormat)?
        .to_string();

    let video_details = player.get("videoDetails");

    Ok(ExtractedStream {
        url,
        ext: mime_extension(
            best.get("mimeType").and_then(|m| m.as_str()).unwrap_or(""),
        ),
        bitrate: best.get("bitrate").and_then(|b| b.as_i64()),
        duration: video_details
            .and_then(|d| d.get("lengthSeconds"))
            .and_then(|l| l.as_str())
            .and_then(|l| l.parse().ok()),
        title: video_details
            .and_then(|d| d.get("title"))
            .and_then(|t| t.as_str())
            .map(|t| t.to_string()),
    })
}

/// Bot checks and sign-in walls are protection rejections, not ordinary
/// unplayability: no persona in the chain can get past them.
fn is_protection(status: &str, reason: &str) -> bool {
    if matches!(status, "LOGIN_REQUIRED" | "AGE_CHECK_REQUIRED") {
        return true;
    }
    let reason = reason.to_lowercase();
    reason.contains("sign in") || reason.contains("not a bot")
}

/// Highest-bitrate audio format among `adaptiveFormats` then `formats`.
///
/// Pass 1 considers audio-only MIME types (`audio/...`); pass 2 falls back
/// to any format whose MIME string mentions an audio codec. Formats without
/// a directly fetchable URL are skipped.
pub fn select_best_audio_format<'a>(
    adaptive_formats: Option<&'a Vec<Value>>,
    formats: Option<&'a Vec<Value>>,
) -> Option<&'a Value> {
    let all: Vec<&Value> = adaptive_formats
        .into_iter()
        .flatten()
        .chain(formats.into_iter().flatten())
        .filter(|f| f.get("url").and_then(|u| u.as_str()).is_some())
        .collect();

    let best_by_bitrate = |candidates: &[&'a Value]| -> Option<&'a Value> {
        candidates
            .iter()
            .max_by_key(|f| f.get("bitrate").and_then(|b| b.as_i64()).unwrap_or(0))
            .copied()
    };

    let audio_only: Vec<&Value> = all
        .iter()
        .copied()
        .filter(|f| mime_of(f).starts_with("audio/"))
        .collect();
    if !audio_only.is_empty() {
        return best_by_bitrate(&audio_only);
    }

    let with_audio_codec: Vec<&Value> = all
        .iter()
        .copied()
        .filter(|f| mime_of(f).to_lowercase().contains("audio"))
        .collect();
    best_by_bitrate(&with_audio_codec)
}

fn mime_of(format: &Value) -> &str {
    format.get("mimeType").and_then(|m| m.as_str()).unwrap_or("")
}

/// `audio/webm; codecs="opus"` → `webm`
fn mime_extension(mime: &str) -> String {
    mime.split('/')
        .nth(1)
        .unwrap_or("mp4")
        .split(';')
        .next()
        .unwrap_or("mp4")
        .trim()
        .to_string()
}
