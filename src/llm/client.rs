use super::ResponseGenerator;
use crate::error::BridgeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Spoken instead of silence when generation fails.
pub const APOLOGY: &str = "申し訳ありません、エラーが発生しました。";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: String,
}

impl Content {
    fn turn(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

/// `generateContent` REST client holding one call's conversation history.
///
/// History is appended only after a successful round trip, so a failed turn
/// leaves the context exactly as it was.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    system_instruction: String,
    history: Mutex<Vec<Content>>,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, api_key: &str, system_instruction: &str) -> Self {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        );

        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key: api_key.to_string(),
            system_instruction: system_instruction.to_string(),
            history: Mutex::new(Vec::new()),
        }
    }

    async fn request_reply(&self, user_text: &str) -> Result<String, BridgeError> {
        let user_turn = Content::turn("user", user_text);

        let contents = {
            let history = self.history.lock().await;
            let mut contents = history.clone();
            contents.push(user_turn.clone());
            contents
        };

        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: self.system_instruction.clone(),
                }],
            },
            contents,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| BridgeError::GenerationFailure(e.to_string()))?
            .error_for_status()
            .map_err(|e| BridgeError::GenerationFailure(e.to_string()))?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::GenerationFailure(e.to_string()))?;

        let reply = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| BridgeError::GenerationFailure("no candidate text".to_string()))?;

        let mut history = self.history.lock().await;
        history.push(user_turn);
        history.push(Content::turn("model", &reply));
        debug!("conversation context now {} turns", history.len());

        Ok(reply)
    }
}

#[async_trait]
impl ResponseGenerator for GeminiClient {
    async fn generate(&self, user_text: &str) -> String {
        match self.request_reply(user_text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("{e}");
                APOLOGY.to_string()
            }
        }
    }
}
