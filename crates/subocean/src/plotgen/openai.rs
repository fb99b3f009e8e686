//! OpenAI GPT API plot generator implementation.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;

use crate::error::{Result, SuboceanError};

use super::generator::{PlotContext, PlotGenConfig, PlotGenerator};
use super::prompts;

/// OpenAI API endpoint.
const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI GPT plot generator.
pub struct OpenAIPlotGenerator {
    client: Client,
    api_key: String,
    config: PlotGenConfig,
}

impl OpenAIPlotGenerator {
    /// Create a new generator with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, PlotGenConfig::default())
    }

    /// Create a new generator with custom configuration.
    pub fn with_config(api_key: impl Into<String>, config: PlotGenConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                SuboceanError::Provider(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    /// Create from environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            SuboceanError::Provider("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Self::new(api_key)
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| SuboceanError::Provider(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }

    fn send_message(&self, user_prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [
                {
                    "role": "system",
                    "content": prompts::system_prompt()
                },
                {
                    "role": "user",
                    "content": user_prompt
                }
            ]
        });

        let response = self
            .client
            .post(API_URL)
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .map_err(|e| SuboceanError::Provider(format!("API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(SuboceanError::Provider(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let api_response: OpenAIResponse = response
            .json()
            .map_err(|e| SuboceanError::Provider(format!("Failed to parse API response: {e}")))?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| SuboceanError::Provider("No response from OpenAI".to_string()))
    }
}

impl PlotGenerator for OpenAIPlotGenerator {
    fn generate(&self, request: &str, context: &PlotContext) -> Result<String> {
        let prompt = prompts::generation_prompt(request, context);
        let response = self.send_message(&prompt)?;
        Ok(strip_code_fences(&response))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Strip a surrounding markdown code fence, if present.
fn strip_code_fences(response: &str) -> String {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the language tag line, then everything after the closing fence.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.rsplit_once("```")
        .map(|(script, _)| script)
        .unwrap_or(body)
        .trim()
        .to_string()
}

/// OpenAI API response structure.
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```python\nplt.show()\n```"),
            "plt.show()"
        );
        assert_eq!(strip_code_fences("plt.show()"), "plt.show()");
        assert_eq!(strip_code_fences("```\nx = 1\n```\n"), "x = 1");
    }
}
