use std::sync::OnceLock;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Body of a single message part; `data` is base64url-encoded as delivered by
/// the mail API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartBody {
    pub data: Option<String>,
}

/// One node of a (possibly multipart) message payload tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessagePart {
    pub mime_type: String,
    pub body: Option<PartBody>,
    pub parts: Vec<MessagePart>,
}

/// A message as handed over by a message source: the headers the pipeline
/// cares about, the payload tree, and the short snippet fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMessage {
    pub id: String,
    pub from: String,
    pub subject: String,
    /// RFC 2822 `Date` header, if present.
    pub date: Option<String>,
    /// Server receive time in epoch millis, if present. Preferred over the
    /// `Date` header when both exist.
    pub internal_date: Option<i64>,
    pub payload: Option<MessagePart>,
    pub snippet: String,
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

fn script_style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
            .expect("invalid script/style regex")
    })
}

/// Collapse all whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    ws_re().replace_all(text.trim(), " ").trim().to_string()
}

fn decode_part_data(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| URL_SAFE.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Strip an HTML document down to its visible text.
pub fn html_to_text(html: &str) -> String {
    let cleaned = script_style_re().replace_all(html, " ");
    let doc = Html::parse_document(&cleaned);
    let text = doc.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

fn find_body(part: &MessagePart, want_html: bool) -> Option<String> {
    let mime = part.mime_type.to_ascii_lowercase();
    let wanted = if want_html { "text/html" } else { "text/plain" };
    if mime == wanted {
        if let Some(decoded) = part
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .and_then(decode_part_data)
        {
            return Some(decoded);
        }
    }
    part.parts.iter().find_map(|p| find_body(p, want_html))
}

/// Best-effort plain-text body: text/plain part first, then stripped
/// text/html, then nothing.
fn extract_best_body(payload: &MessagePart) -> Option<String> {
    find_body(payload, false).or_else(|| find_body(payload, true).map(|h| html_to_text(&h)))
}

/// Produce the single plain-text string every downstream extractor matches
/// against: subject + best available body, whitespace-collapsed.
///
/// Decode failures never propagate; the shortest available fallback (the
/// snippet) is used instead.
pub fn normalized_text(msg: &RawMessage) -> String {
    let body = msg
        .payload
        .as_ref()
        .and_then(extract_best_body)
        .unwrap_or_else(|| msg.snippet.clone());
    collapse_whitespace(&format!("{} {}", msg.subject, body))
}

/// Resolve a message's point-in-time: server receive millis, then the `Date`
/// header, then the ingestion clock. Never fails.
pub fn message_timestamp(msg: &RawMessage, clock: &dyn Clock) -> DateTime<Utc> {
    if let Some(millis) = msg.internal_date {
        if let Some(ts) = chrono::TimeZone::timestamp_millis_opt(&Utc, millis).single() {
            return ts;
        }
    }
    if let Some(date) = msg.date.as_deref() {
        if let Ok(parsed) = DateTime::parse_from_rfc2822(date) {
            return parsed.with_timezone(&Utc);
        }
    }
    clock.now()
}
