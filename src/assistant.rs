/// Hosted AI assistant client
///
/// Summarises study material through an Azure OpenAI assistant: a thread is
/// created per request, the text is posted as a user message, a run is
/// started and polled until it reaches a terminal state, and the newest
/// assistant message is returned.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::configuration::AssistantSettings;
use crate::error::{AppError, AssistantError};

const SUMMARY_INSTRUCTION: &str = "Сделай краткий конспект следующего текста:";

#[derive(Clone)]
pub struct AssistantClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    assistant_id: String,
    poll_interval: Duration,
    max_polls: u32,
}

#[derive(Deserialize)]
struct Thread {
    id: String,
}

#[derive(Deserialize)]
struct Run {
    id: String,
    status: String,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<Message>,
}

#[derive(Deserialize)]
struct Message {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Deserialize)]
struct MessageContent {
    text: Option<MessageText>,
}

#[derive(Deserialize)]
struct MessageText {
    value: String,
}

fn is_terminal(status: &str) -> bool {
    matches!(status, "completed" | "failed" | "cancelled" | "expired")
}

impl AssistantClient {
    pub fn new(settings: &AssistantSettings, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            api_version: settings.api_version.clone(),
            assistant_id: settings.assistant_id.clone(),
            poll_interval: settings.poll_interval(),
            max_polls: settings.max_polls,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/openai/{}", self.endpoint, path)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AssistantError> {
        request
            .header("api-key", &self.api_key)
            .query(&[("api-version", self.api_version.as_str())])
            .send()
            .await
            .map_err(|e| AssistantError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| AssistantError::Request(e.to_string()))?
            .json::<T>()
            .await
            .map_err(|e| AssistantError::Request(format!("unexpected response: {}", e)))
    }

    /// Ask the assistant for a short summary of `text`
    pub async fn summarize_text(&self, text: &str) -> Result<String, AppError> {
        tracing::info!(chars = text.chars().count(), "Creating assistant thread");
        let thread: Thread = self
            .send(self.http_client.post(self.url("threads")).json(&json!({})))
            .await?;

        let _: serde_json::Value = self
            .send(
                self.http_client
                    .post(self.url(&format!("threads/{}/messages", thread.id)))
                    .json(&json!({
                        "role": "user",
                        "content": format!("{}\n\n{}", SUMMARY_INSTRUCTION, text),
                    })),
            )
            .await?;

        tracing::info!(thread_id = %thread.id, "Running assistant");
        let mut run: Run = self
            .send(
                self.http_client
                    .post(self.url(&format!("threads/{}/runs", thread.id)))
                    .json(&json!({ "assistant_id": self.assistant_id })),
            )
            .await?;

        let mut polls = 0;
        while !is_terminal(&run.status) {
            if polls >= self.max_polls {
                return Err(AssistantError::TimedOut(polls).into());
            }
            tokio::time::sleep(self.poll_interval).await;
            polls += 1;
            run = self
                .send(
                    self.http_client
                        .get(self.url(&format!("threads/{}/runs/{}", thread.id, run.id))),
                )
                .await?;
        }

        if run.status != "completed" {
            tracing::warn!(thread_id = %thread.id, status = %run.status, "Assistant run did not complete");
            return Err(AssistantError::RunFailed(run.status).into());
        }

        let messages: MessageList = self
            .send(
                self.http_client
                    .get(self.url(&format!("threads/{}/messages", thread.id))),
            )
            .await?;

        let summary = messages
            .data
            .into_iter()
            .filter(|m| m.role == "assistant")
            .flat_map(|m| m.content)
            .find_map(|c| c.text)
            .map(|t| t.value.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(AssistantError::EmptyResponse)?;

        Ok(summary)
    }
}
