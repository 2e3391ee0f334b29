use crate::{l2_normalize, EmbedResponse, EmbeddingProvider, FeatureExtractor, ProviderError};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
}

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    cfg: Arc<OpenAiConfig>,
}

impl OpenAiProvider {
    pub fn new(cfg: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            cfg: Arc::new(cfg),
        }
    }

    async fn post<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProviderError> {
        let resp = self
            .client
            .post(format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path))
            .bearer_auth(&self.cfg.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(format!(
                "status {} body {:?}",
                status, body
            )));
        }
        Ok(resp)
    }
}

#[derive(Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        #[derive(serde::Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        let body = EmbedRequest {
            model: &self.cfg.embedding_model,
            input: texts,
        };

        let parsed: EmbeddingApiResponse = self
            .post("/v1/embeddings", &body)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        Ok(EmbedResponse {
            vectors: parsed
                .data
                .into_iter()
                .map(|d| {
                    let mut v = d.embedding;
                    l2_normalize(&mut v);
                    v
                })
                .collect(),
        })
    }
}

const FEATURE_PROMPT: &str = "Extract the independent features (limitations) from the following patent claim.
Return the result as a raw JSON list of strings. Each string should be a distinct feature.
Do not include the preamble or the transition phrase in the list unless it contains a limitation.
Normalize the text (remove numbering like '1.', 'a)', etc.).";

#[async_trait::async_trait]
impl FeatureExtractor for OpenAiProvider {
    async fn extract(&self, claim: &str) -> Result<BTreeSet<String>, ProviderError> {
        #[derive(serde::Serialize)]
        struct ChatMessage<'a> {
            role: &'static str,
            content: &'a str,
        }
        #[derive(serde::Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChatMessageResp,
        }
        #[derive(Deserialize)]
        struct ChatMessageResp {
            content: String,
        }
        #[derive(Deserialize)]
        struct ChatApiResponse {
            choices: Vec<Choice>,
        }

        let prompt = format!("{FEATURE_PROMPT}\n\nClaim:\n{claim}\n\nJSON Output:");
        let body = ChatRequest {
            model: &self.cfg.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are an expert patent agent. Extract the independent features (limitations) from the patent claim provided.",
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let parsed: ChatApiResponse = self
            .post("/v1/chat/completions", &body)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices returned".into()))?;

        Ok(parse_feature_list(&content))
    }
}

/// Parse a model answer into a feature set.
///
/// Accepts a JSON list (optionally wrapped in a markdown fence), a single JSON
/// value, or plain text with one feature per line.
pub fn parse_feature_list(content: &str) -> BTreeSet<String> {
    let cleaned = content
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();

    let raw: Vec<String> = match serde_json::from_str::<serde_json::Value>(&cleaned) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Ok(serde_json::Value::String(s)) => vec![s],
        Ok(other) => vec![other.to_string()],
        Err(err) => {
            debug!("feature answer is not JSON, splitting lines: {err}");
            cleaned.lines().map(str::to_string).collect()
        }
    };

    raw.into_iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect()
}
