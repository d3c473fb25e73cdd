/// Agent Chat Proxy — forwards chat messages to the remote conversational
/// agent so browser clients avoid cross-origin restrictions.
///
/// All calls to the agent endpoint go through `AgentClient`. One attempt per
/// message: no retries, no queueing.
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

pub mod handlers;

pub const DEFAULT_AGENT_API_URL: &str = "https://cmfy9so1f663u2py5v2lkqba8.agent.a.smyth.ai";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{0}")]
    Network(#[source] reqwest::Error),

    #[error("Agent API responded with status: {status} - {reason}. Response: {body}")]
    Upstream {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Agent API returned an unreadable response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Chat payload as sent by the browser. Only `message` is required;
/// the rest is passed through untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<Value>,
    pub context: Option<Value>,
    pub agent_id: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentPayload<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a Value>,
    context: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_id: Option<&'a Value>,
}

#[derive(Clone)]
pub struct AgentClient {
    client: Client,
    url: String,
}

impl AgentClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Forwards one message and returns the agent's JSON reply as-is.
    pub async fn chat(&self, message: &str, request: &ChatRequest) -> Result<Value, AgentError> {
        let empty_context = Value::String(String::new());
        let context = match &request.context {
            Some(Value::Null) | None => &empty_context,
            Some(context) => context,
        };

        let payload = AgentPayload {
            message,
            session_id: request.session_id.as_ref(),
            context,
            agent_id: request.agent_id.as_ref(),
        };

        debug!("Sending request to agent API at {}: {:?}", self.url, payload);

        let response = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(AgentError::Network)?;

        let status = response.status();
        info!("Agent API response status: {status}");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Agent API error response: {body}");
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let reply: Value = response.json().await.map_err(AgentError::Decode)?;
        debug!("Agent API success response: {reply}");
        Ok(reply)
    }
}
