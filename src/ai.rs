//! Talking to the language model: prompt construction, the Gemini REST
//! client, and parsing the JSON suggestion it sends back.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::{format_days, Activity, LogEntry, Suggestion, SuggestionStatus};
use crate::utils::format_hhmm;

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Environment variable consulted when the config has no API key
pub const API_KEY_ENV: &str = "TMK_GEMINI_API_KEY";
/// Most recent logs quoted in a prompt
pub const PROMPT_LOG_LIMIT: usize = 7;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum AiError {
    #[error("No API key configured (set ai.api_key or TMK_GEMINI_API_KEY)")]
    MissingApiKey,
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Model returned no content")]
    EmptyResponse,
    #[error("Failed to parse model output: {0}")]
    Parse(String),
}

/// Anything that can turn a prompt into text
pub trait SuggestionModel {
    /// `Ok(None)` when the model answered without any text
    fn generate(&self, prompt: &str) -> Result<Option<String>, AiError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Blocking client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, endpoint: String) -> Result<Self, AiError> {
        if api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Key with everything but the last four characters hidden, for logs
    pub fn masked_key(&self) -> String {
        let visible: String = self
            .api_key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", visible)
    }
}

impl SuggestionModel for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<Option<String>, AiError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        log::debug!("calling {} with key {}", url, self.masked_key());

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(AiError::Api { status, body });
        }

        let body: GenerateResponse = response.json()?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}

// Double quotes would break the JSON example embedded in the prompt
fn sanitize(text: &str) -> String {
    text.replace('"', "'")
}

/// Prompt asking for a better window for `activity`, quoting its most
/// recent logs (oldest first).
pub fn build_prompt(activity: &Activity, logs: &[LogEntry]) -> String {
    let recent = &logs[logs.len().saturating_sub(PROMPT_LOG_LIMIT)..];
    let title = sanitize(&activity.title);

    let mut history = String::new();
    for log in recent {
        history.push_str(&format!(
            "- {}: {} -> {} ({} minutes, {})\n",
            log.day_label.long_name(),
            log.actual_start.format("%H:%M"),
            log.actual_end.format("%H:%M"),
            log.duration_secs / 60,
            if log.completed { "✅" } else { "❌" },
        ));
    }

    format!(
        "You are a personal time-management assistant.\n\
         The user plans the activity \"{title}\" from {start} to {end}.\n\
         Repeats on: {days}\n\
         Recent sessions:\n\
         {history}\n\
         Based on when the user actually does this activity, suggest a better time window.\n\
         Reply with JSON only, no explanation, in exactly this shape:\n\
         {{\n  \"activityId\": \"{id}\",\n  \"activityTitle\": \"{title}\",\n  \"currentStart\": \"{start}\",\n  \"currentEnd\": \"{end}\",\n  \"suggestedStart\": \"HH:mm\",\n  \"suggestedEnd\": \"HH:mm\",\n  \"reason\": \"short explanation\"\n}}",
        title = title,
        start = format_hhmm(activity.start_time),
        end = format_hhmm(activity.end_time),
        history = history,
        days = format_days(&activity.repeat_days),
        id = activity.id,
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    activity_id: String,
    activity_title: String,
    current_start: String,
    current_end: String,
    suggested_start: String,
    suggested_end: String,
    reason: String,
}

/// Strip an optional ```json fence and decode the suggestion object.
/// Owner, id and request label are left for the caller to fill in.
pub fn parse_response(raw: &str) -> Result<Suggestion, AiError> {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix("```json").unwrap_or(trimmed);
    let body = body.strip_prefix("```").unwrap_or(body);
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body).trim();

    let parsed: RawSuggestion =
        serde_json::from_str(body).map_err(|e| AiError::Parse(format!("{} in: {}", e, body)))?;
    Ok(Suggestion {
        id: String::new(),
        user_id: String::new(),
        activity_id: parsed.activity_id,
        activity_title: parsed.activity_title,
        current_start: parsed.current_start,
        current_end: parsed.current_end,
        suggested_start: parsed.suggested_start,
        suggested_end: parsed.suggested_end,
        reason: parsed.reason,
        requested_at: String::new(),
        status: SuggestionStatus::Pending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayLabel, PomodoroSettings};
    use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};

    const REPLY: &str = r#"{
        "activityId": "a1",
        "activityTitle": "Gym",
        "currentStart": "06:00",
        "currentEnd": "07:00",
        "suggestedStart": "18:00",
        "suggestedEnd": "19:00",
        "reason": "You usually train in the evening"
    }"#;

    fn activity() -> Activity {
        Activity {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            title: "The \"big\" gym".to_string(),
            category: "Sport".to_string(),
            start_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            repeat_days: vec![DayLabel::Mon],
            pomodoro: PomodoroSettings::default(),
        }
    }

    fn logs(count: u32) -> Vec<LogEntry> {
        (0..count)
            .map(|i| {
                let date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap() + ChronoDuration::days(i as i64);
                let start = date.and_hms_opt(18, i % 60, 0).unwrap();
                LogEntry {
                    id: format!("l{}", i),
                    activity_id: "a1".to_string(),
                    user_id: "u1".to_string(),
                    date,
                    day_label: DayLabel::from_weekday(chrono::Datelike::weekday(&date)),
                    start_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                    actual_start: start,
                    actual_end: start + ChronoDuration::minutes(50),
                    duration_secs: 3000,
                    completed: true,
                    analyzed: false,
                }
            })
            .collect()
    }

    #[test]
    fn parses_plain_json() {
        let s = parse_response(REPLY).unwrap();
        assert_eq!(s.activity_id, "a1");
        assert_eq!(s.suggested_start, "18:00");
        assert_eq!(s.status, SuggestionStatus::Pending);
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{}\n```", REPLY);
        assert_eq!(parse_response(&fenced).unwrap().suggested_end, "19:00");
        let bare_fence = format!("```\n{}\n```\n", REPLY);
        assert_eq!(parse_response(&bare_fence).unwrap().reason, "You usually train in the evening");
    }

    #[test]
    fn missing_field_is_a_parse_error() {
        let broken = r#"{"activityId": "a1", "suggestedStart": "18:00"}"#;
        assert!(matches!(parse_response(broken), Err(AiError::Parse(_))));
        assert!(matches!(parse_response("Sorry, I can't"), Err(AiError::Parse(_))));
    }

    #[test]
    fn prompt_quotes_only_recent_logs_and_sanitizes_title() {
        let prompt = build_prompt(&activity(), &logs(10));
        assert_eq!(prompt.matches(" -> ").count(), PROMPT_LOG_LIMIT);
        // oldest three are dropped
        assert!(!prompt.contains("18:00 -> 18:50"));
        assert!(prompt.contains("18:09 -> 18:59"));
        assert!(prompt.contains("The 'big' gym"));
        assert!(prompt.contains("\"activityId\": \"a1\""));
        assert!(prompt.contains("\"currentStart\": \"06:00\""));
        assert!(prompt.contains("(50 minutes, ✅)"));
        assert!(prompt.contains("Repeats on: Mon"));
    }

    #[test]
    fn prompt_marks_incomplete_sessions() {
        let mut entries = logs(1);
        entries[0].completed = false;
        let prompt = build_prompt(&activity(), &entries);
        assert!(prompt.contains("(50 minutes, ❌)"));
        assert!(!prompt.contains("✅"));
    }

    #[test]
    fn client_requires_key() {
        assert!(matches!(
            GeminiClient::new(" ".to_string(), DEFAULT_MODEL.to_string(), DEFAULT_ENDPOINT.to_string()),
            Err(AiError::MissingApiKey)
        ));
        let client = GeminiClient::new(
            "secret-key-1234".to_string(),
            DEFAULT_MODEL.to_string(),
            format!("{}/", DEFAULT_ENDPOINT),
        )
        .unwrap();
        assert_eq!(client.masked_key(), "****1234");
        assert_eq!(client.endpoint, DEFAULT_ENDPOINT);
    }
}
