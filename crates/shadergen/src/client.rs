use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::extract_fragment_source;

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:4000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Failure reported at the generation boundary. `Display` is the message shown
/// to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The request never produced a usable JSON body.
    #[error("Failed to connect to server: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("{0}")]
    ServerReported(String),
    #[error("Server response missing shader code")]
    MissingShaderCode,
    #[error("invalid API url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub base_url: Url,
}

impl GenerationConfig {
    pub fn new(base_url: &str) -> Result<Self, GenerationError> {
        let parsed = Url::parse(base_url.trim()).map_err(|err| GenerationError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(GenerationError::InvalidUrl {
                url: base_url.to_string(),
                reason: "not a base url".to_string(),
            });
        }
        Ok(Self { base_url: parsed })
    }

    /// `{base_url}/api/generate_shader`, keeping any path prefix on the base.
    pub fn endpoint(&self) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("api").push("generate_shader");
        }
        url
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default API url is valid"),
        }
    }
}

/// Anything that can turn a prompt into fragment shader source.
pub trait ShaderGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    shader_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Blocking client for the shader generation endpoint.
#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    http: Client,
    config: GenerationConfig,
}

impl HttpGenerationClient {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| GenerationError::Transport(err.to_string()))?;
        Ok(Self { http, config })
    }

    /// Sends `prompt` and returns the raw `shader_code` from the response.
    pub fn request_shader_code(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = self.config.endpoint();
        debug!(%url, "requesting shader generation");
        let response = self
            .http
            .post(url)
            .json(&GenerateRequest { prompt })
            .send()
            .map_err(|err| GenerationError::Transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| GenerationError::Transport(err.to_string()))?;
        interpret_response(status, &body)
    }
}

impl ShaderGenerator for HttpGenerationClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let code = self.request_shader_code(prompt)?;
        Ok(extract_fragment_source(&code))
    }
}

/// Maps a status and body from the generation endpoint onto its result.
///
/// A body that is not a JSON object counts as a transport failure whatever
/// the status, since neither the code nor an error message can be read.
pub fn interpret_response(status: StatusCode, body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|err| GenerationError::Transport(format!("invalid response body: {err}")))?;

    if status.is_success() {
        match parsed.shader_code {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(GenerationError::MissingShaderCode),
        }
    } else {
        let message = parsed
            .error
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "Failed to generate shader".to_string());
        Err(GenerationError::ServerReported(message))
    }
}
