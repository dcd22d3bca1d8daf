//! Best-effort task extraction from estimate transcriptions.
//!
//! This is an explicit non-blocking extension of the estimate pipeline: its
//! failure is logged and must never revert the already-written `Complete`
//! state.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::{WorkerError, WorkerResult};

/// Derives a list of actionable task names from a transcription.
pub trait TaskExtractor: Send + Sync {
    fn extract(&self, transcription: &str) -> WorkerResult<Vec<String>>;
}

const SYSTEM_PROMPT: &str = "You are a construction project task extractor. Given a voice memo \
transcription from a job site estimate walkthrough, extract a list of discrete actionable tasks \
that need to be performed. Return ONLY a JSON array of task name strings. Each task should be \
concise (5-15 words). Do not include commentary.";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Extractor backed by a local Ollama instance.
pub struct OllamaExtractor {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
}

impl OllamaExtractor {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> WorkerResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| WorkerError::extraction(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            model: model.into(),
        })
    }
}

impl TaskExtractor for OllamaExtractor {
    fn extract(&self, transcription: &str) -> WorkerResult<Vec<String>> {
        let prompt = format!(
            "New estimate transcription:\n{transcription}\n\nExtract the tasks as a JSON array:"
        );
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "system": SYSTEM_PROMPT,
            "stream": false,
        });

        let response: GenerateResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| WorkerError::extraction(e.to_string()))?
            .json()
            .map_err(|e| WorkerError::extraction(e.to_string()))?;

        let tasks = parse_task_array(&response.response);
        if tasks.is_empty() && !response.response.is_empty() {
            warn!(
                "could not parse tasks from model response: {:.200}",
                response.response
            );
        }
        Ok(tasks)
    }
}

/// Pull a JSON array of task strings out of a model response, tolerating
/// surrounding prose or markdown fences.
fn parse_task_array(response: &str) -> Vec<String> {
    let candidates = [response, extract_bracketed(response).unwrap_or_default()];
    for candidate in candidates {
        if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(candidate.trim()) {
            return items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .filter(|task| !task.is_empty())
                .collect();
        }
    }
    Vec::new()
}

/// First `[...]` segment of the response, if any.
fn extract_bracketed(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text[start..].find(']')? + start;
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_direct_json_array() {
        let tasks = parse_task_array(r#"["grade the lot", "pour slab"]"#);
        assert_eq!(tasks, vec!["grade the lot", "pour slab"]);
    }

    #[test]
    fn test_parses_array_embedded_in_prose() {
        let tasks = parse_task_array(
            "Here are the tasks:\n```json\n[\"demo old deck\", \"haul debris\"]\n```\nDone.",
        );
        assert_eq!(tasks, vec!["demo old deck", "haul debris"]);
    }

    #[test]
    fn test_unparseable_response_yields_nothing() {
        assert!(parse_task_array("no tasks found").is_empty());
        assert!(parse_task_array("").is_empty());
        assert!(parse_task_array(r#"{"tasks": "wrong shape"}"#).is_empty());
    }

    #[test]
    fn test_blank_entries_are_dropped() {
        let tasks = parse_task_array(r#"["  ", "set forms", ""]"#);
        assert_eq!(tasks, vec!["set forms"]);
    }
}
