use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value as JsonValue};

use crate::error::Result;

pub const DISABLED_MESSAGE: &str =
    "The AI assistant is not configured on this site. Please use the contact form instead.";
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I'm having trouble connecting to my brain right now. Please try again later.";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Single-turn, stateless completion for the portfolio assistant.
#[derive(Clone)]
pub struct ChatService {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    system_instruction: String,
}

impl ChatService {
    pub fn new(api_key: Option<String>, model: String, owner: &str, client: Client) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
            system_instruction: system_instruction(owner),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Never fails: an unconfigured service answers with a static notice and
    /// upstream errors are logged and replaced by an apology.
    pub async fn complete(&self, prompt: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return DISABLED_MESSAGE.to_string();
        };
        match self.generate(api_key, prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = ?e, "Error generating response from Gemini API");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String> {
        let payload = json!({
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.7,
                "topP": 1,
                "topK": 1
            }
        });

        let res = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", api_key)])
            .json(&payload)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Gemini API Error {}: {}", status, text).into());
        }

        let body: JsonValue = res.json().await?;
        extract_text(&body).ok_or_else(|| anyhow::anyhow!("Invalid Gemini response format").into())
    }
}

fn system_instruction(owner: &str) -> String {
    format!(
        "You are a friendly and helpful AI assistant for {owner}'s personal portfolio website. \
         Your goal is to answer questions about {owner}, their skills, projects, and experience \
         based on the context of a software developer portfolio. Be professional, concise, and \
         encourage users to get in touch via the contact form for more detailed inquiries. \
         Do not make up information that is not typically found in a portfolio. \
         Keep your answers conversational and brief."
    )
}

fn extract_text(body: &JsonValue) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
