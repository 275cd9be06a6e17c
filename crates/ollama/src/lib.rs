//! Summarizer backed by a local Ollama server.
//!
//! Sends each section's body text to `/api/generate` and concatenates the
//! streamed `response` fragments.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use slides_core::{Error, Result, Summarizer};
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "mistral";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the instruction sent ahead of a section's text.
pub fn build_prompt(content: &str) -> String {
    format!(
        "I am giving you a paragraph. Return a topic and a summary as short bullet points. \
         Keep every point brief and to the point. \
         Strictly follow this format, one item per line:\n\
         Topic: <topic>\n\
         Summary: <first point>\n\
         <second point>\n\
         <third point>\n\n\
         Make the bullet points concise and presentation-friendly.\n\n\
         Content:\n{}",
        content
    )
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
}

/// Concatenate the `response` fields of a newline-delimited JSON body.
///
/// Lines that are not valid JSON are skipped. Returns `None` when nothing
/// but whitespace was produced.
pub fn parse_ndjson_response(body: &str) -> Option<String> {
    let mut text = String::new();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<GenerateChunk>(line) {
            Ok(chunk) => {
                if let Some(fragment) = chunk.response {
                    text.push_str(&fragment);
                }
            }
            Err(e) => log::warn!("Skipping undecodable response line: {}", e),
        }
    }

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Calls `POST {base_url}/api/generate` for each summary.
#[derive(Debug, Clone)]
pub struct OllamaSummarizer {
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OllamaSummarizer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full URL of the generate endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, text: &str) -> GenerateRequest<'_> {
        GenerateRequest {
            model: &self.model,
            prompt: build_prompt(text),
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        }
    }

    /// Turn a response body into a summary, or `SummarizerUnavailable` when
    /// the model produced nothing.
    fn summary_from_body(&self, body: &str) -> Result<String> {
        parse_ndjson_response(body).ok_or_else(|| {
            Error::SummarizerUnavailable(format!("{} returned an empty response", self.model))
        })
    }
}

impl Default for OllamaSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl Summarizer for OllamaSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        let unavailable = |e: reqwest::Error| Error::SummarizerUnavailable(e.to_string());

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(unavailable)?;

        log::debug!(
            "Requesting summary of {} chars from {} ({})",
            text.len(),
            self.endpoint(),
            self.model
        );

        let body = client
            .post(self.endpoint())
            .json(&self.request_body(text))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(unavailable)?;

        self.summary_from_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_streamed_body() {
        let body = concat!(
            "{\"model\":\"mistral\",\"response\":\"Topic: Cells\\n\",\"done\":false}\n",
            "{\"model\":\"mistral\",\"response\":\"Summary: They divide\",\"done\":false}\n",
            "{\"model\":\"mistral\",\"response\":\"\",\"done\":true}\n",
        );
        assert_eq!(
            parse_ndjson_response(body).as_deref(),
            Some("Topic: Cells\nSummary: They divide")
        );
    }

    #[test]
    fn test_parse_skips_bad_lines() {
        let body = "not json\n{\"response\":\"ok\"}\n{broken\n";
        assert_eq!(parse_ndjson_response(body).as_deref(), Some("ok"));
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert_eq!(parse_ndjson_response(""), None);
        assert_eq!(parse_ndjson_response("{\"response\":\"   \"}"), None);
        assert_eq!(parse_ndjson_response("{\"done\":true}"), None);
    }

    #[test]
    fn test_request_body_shape() {
        let s = OllamaSummarizer::new("http://localhost:11434/")
            .with_model("llama3")
            .with_temperature(0.5)
            .with_max_tokens(200);

        let json = serde_json::to_value(s.request_body("Some text")).unwrap();
        assert_eq!(json["model"], "llama3");
        assert_eq!(json["options"]["temperature"], 0.5);
        assert_eq!(json["options"]["num_predict"], 200);
        assert!(json["prompt"].as_str().unwrap().ends_with("Content:\nSome text"));
        assert_eq!(s.endpoint(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_empty_body_is_unavailable() {
        let s = OllamaSummarizer::default().with_model("llama3");

        let err = s.summary_from_body("{\"response\":\"\",\"done\":true}\n").unwrap_err();
        assert!(matches!(err, Error::SummarizerUnavailable(ref m) if m.contains("llama3")));
        assert!(!err.is_fatal());

        assert_eq!(
            s.summary_from_body("{\"response\":\"Topic: X\"}").unwrap(),
            "Topic: X"
        );
    }
}
