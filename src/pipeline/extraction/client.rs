use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// One completed inference call.
#[derive(Debug, Clone)]
pub struct InferenceResponse {
    /// Raw model output text.
    pub text: String,
    /// Prompt + completion token count, when the provider reports it.
    pub tokens_used: Option<u64>,
}

/// Abstraction over the inference endpoint so the engine can be tested
/// without a running model server.
pub trait InferenceClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<InferenceResponse, ExtractionError>;
}

/// HTTP client for an Ollama-compatible `/api/generate` endpoint.
pub struct HttpInferenceClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpInferenceClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            timeout_secs,
        })
    }
}

/// Request body for /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl InferenceClient for HttpInferenceClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<InferenceResponse, ExtractionError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                ExtractionError::Connection {
                    url: self.base_url.clone(),
                }
            } else if e.is_timeout() {
                ExtractionError::Timeout {
                    seconds: self.timeout_secs,
                }
            } else {
                ExtractionError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        let tokens_used = match (parsed.prompt_eval_count, parsed.eval_count) {
            (None, None) => None,
            (p, e) => Some(p.unwrap_or(0) + e.unwrap_or(0)),
        };

        Ok(InferenceResponse {
            text: parsed.response,
            tokens_used,
        })
    }
}

/// Scripted client for tests. Serves canned replies in order, then
/// repeats the last one.
#[cfg(test)]
pub struct MockInferenceClient {
    replies: std::sync::Mutex<Vec<Result<InferenceResponse, String>>>,
    pub calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockInferenceClient {
    pub fn replying(text: &str) -> Self {
        Self {
            replies: std::sync::Mutex::new(vec![Ok(InferenceResponse {
                text: text.to_string(),
                tokens_used: Some(128),
            })]),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// One reply per expected call, in order; the last reply repeats.
    pub fn scripted(texts: &[&str]) -> Self {
        Self {
            replies: std::sync::Mutex::new(
                texts
                    .iter()
                    .map(|t| {
                        Ok(InferenceResponse {
                            text: t.to_string(),
                            tokens_used: Some(128),
                        })
                    })
                    .collect(),
            ),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            replies: std::sync::Mutex::new(vec![Err(message.to_string())]),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl InferenceClient for MockInferenceClient {
    fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _system: &str,
    ) -> Result<InferenceResponse, ExtractionError> {
        self.calls.lock().unwrap().push(prompt.to_string());
        let replies = self.replies.lock().unwrap();
        let next = if replies.len() == 1 {
            replies[0].clone()
        } else {
            let index = (self.calls.lock().unwrap().len() - 1).min(replies.len() - 1);
            replies[index].clone()
        };
        next.map_err(ExtractionError::HttpClient)
    }
}
