//! Video transcript extraction for YouTube links.

use idea_farm_core::ports::ExtractionFailure;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

pub const TRANSCRIPT_LABEL: &str = "YouTube Transcript:\n\n";

const WATCH_URL: &str = "https://www.youtube.com/watch";

const VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

const SHORT_LINK_HOSTS: &[&str] = &["youtu.be", "www.youtu.be"];

/// Path prefixes that carry the id as the next segment.
const ID_PATH_PREFIXES: &[&str] = &["shorts", "embed", "live", "v"];

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parses a video id out of a YouTube URL, or `None` for anything else.
pub fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = if SHORT_LINK_HOSTS.contains(&host.as_str()) {
        segments.next().map(str::to_string)
    } else if VIDEO_HOSTS.contains(&host.as_str()) {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some(prefix) if ID_PATH_PREFIXES.contains(&prefix) => {
                segments.next().map(str::to_string)
            }
            _ => None,
        }
    } else {
        None
    };

    candidate.filter(|id| is_video_id(id))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    #[serde(default)]
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedEvent {
    #[serde(default)]
    t_start_ms: i64,
    #[serde(default)]
    segs: Vec<Segment>,
}

#[derive(Deserialize)]
struct Segment {
    #[serde(default)]
    utf8: String,
}

/// Reads the caption track list embedded in a watch page.
fn caption_tracks(watch_html: &str) -> Vec<CaptionTrack> {
    const MARKER: &str = "\"captionTracks\":";
    let Some(start) = watch_html.find(MARKER) else {
        return Vec::new();
    };
    let rest = &watch_html[start + MARKER.len()..];
    serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .and_then(Result::ok)
        .unwrap_or_default()
}

/// Prefers a human English track, then auto-generated English, then whatever is first.
fn choose_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    let english = |t: &&CaptionTrack| t.language_code.starts_with("en");
    let generated = |t: &&CaptionTrack| t.kind.as_deref() == Some("asr");
    tracks
        .iter()
        .find(|t| english(t) && !generated(t))
        .or_else(|| tracks.iter().find(english))
        .or_else(|| tracks.first())
}

/// Joins json3 timed-text segments in temporal order.
fn transcript_text(timed_text_json: &str) -> Option<String> {
    let mut timed: TimedText = serde_json::from_str(timed_text_json).ok()?;
    timed.events.sort_by_key(|event| event.t_start_ms);
    let text = timed
        .events
        .iter()
        .map(|event| event.segs.iter().map(|s| s.utf8.as_str()).collect::<String>())
        .flat_map(|line| {
            line.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .join(" ");
    Some(text).filter(|t| !t.is_empty())
}

pub struct TranscriptFetcher {
    http: reqwest::Client,
    watch_url: String,
}

impl TranscriptFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            watch_url: WATCH_URL.to_string(),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, ExtractionFailure> {
        self.http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExtractionFailure::Fetch(e.to_string()))?
            .text()
            .await
            .map_err(|e| ExtractionFailure::Fetch(e.to_string()))
    }

    /// Fetches and flattens the transcript; a video without captions is `NoTranscript`.
    pub async fn fetch_transcript(&self, video_id: &str) -> Result<String, ExtractionFailure> {
        let no_transcript = || ExtractionFailure::NoTranscript(video_id.to_string());

        let watch_page = self
            .get_text(&format!("{}?v={}", self.watch_url, video_id))
            .await
            .map_err(|e| {
                warn!(video_id = %video_id, "Could not load watch page: {}", e);
                no_transcript()
            })?;

        let tracks = caption_tracks(&watch_page);
        let track = choose_track(&tracks).ok_or_else(|| {
            warn!(video_id = %video_id, "Video has no caption tracks");
            no_transcript()
        })?;
        info!(video_id = %video_id, language = %track.language_code, "Fetching transcript track");

        let timed_text = self
            .get_text(&format!("{}&fmt=json3", track.base_url))
            .await
            .map_err(|e| {
                warn!(video_id = %video_id, "Could not get transcript: {}", e);
                no_transcript()
            })?;

        let text = transcript_text(&timed_text).ok_or_else(no_transcript)?;
        Ok(format!("{}{}", TRANSCRIPT_LABEL, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_of(url: &str) -> Option<String> {
        video_id(&Url::parse(url).unwrap())
    }

    #[test]
    fn recognises_video_urls() {
        assert_eq!(id_of("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id_of("https://youtu.be/dQw4w9WgXcQ?si=abc").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id_of("https://m.youtube.com/shorts/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id_of("https://youtube.com/embed/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn rejects_non_video_urls() {
        assert_eq!(id_of("https://www.youtube.com/@channel"), None);
        assert_eq!(id_of("https://www.youtube.com/watch"), None);
        assert_eq!(id_of("https://vimeo.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(id_of("https://youtu.be/"), None);
    }

    #[test]
    fn reads_caption_tracks_from_watch_page() {
        let html = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=de","languageCode":"de"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=en&kind=asr","languageCode":"en","kind":"asr"}],"audioTracks":[]}}};</script>"#;
        let tracks = caption_tracks(html);
        assert_eq!(tracks.len(), 2);
        let chosen = choose_track(&tracks).unwrap();
        assert_eq!(chosen.language_code, "en");
        assert!(chosen.base_url.contains("&lang=en"));
    }

    #[test]
    fn joins_segments_in_temporal_order() {
        let json = r#"{"events":[
            {"tStartMs":2000,"segs":[{"utf8":"world\n"}]},
            {"tStartMs":0,"segs":[{"utf8":"hello"},{"utf8":" there"}]},
            {"tStartMs":1000}
        ]}"#;
        assert_eq!(transcript_text(json).as_deref(), Some("hello there world"));
    }

    #[test]
    fn empty_timed_text_is_none() {
        assert_eq!(transcript_text(r#"{"events":[]}"#), None);
        assert_eq!(transcript_text("<transcript/>"), None);
    }
}
