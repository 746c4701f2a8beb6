//! services/api/src/adapters/freepik.rs
//!
//! This module contains the adapter for Freepik's text-to-image service.
//! It implements the `ImageGenerationService` port by creating a task and polling it.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use elearning_core::ports::{ImageGenerationService, PortError, PortResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct FreepikAdapter {
    client: Client,
    api_url: String,
    api_key: String,
    max_attempts: u32,
    poll_interval: Duration,
}

#[derive(Deserialize)]
struct TaskEnvelope {
    data: Option<TaskData>,
}

#[derive(Deserialize)]
struct TaskData {
    task_id: Option<String>,
    status: Option<String>,
    #[serde(default)]
    generated: Vec<String>,
}

/// What a single poll of the task found.
#[derive(Debug, PartialEq, Eq)]
enum PollState {
    Ready(String),
    Failed(String),
    Pending,
}

fn poll_state(data: &TaskData) -> PollState {
    match data.status.as_deref() {
        Some("COMPLETED") => data
            .generated
            .iter()
            .find(|url| url.starts_with("https://"))
            .map(|url| PollState::Ready(url.clone()))
            .unwrap_or(PollState::Pending),
        Some(status @ ("FAILED" | "ERROR" | "CANCELED")) => PollState::Failed(status.to_string()),
        _ => PollState::Pending,
    }
}

impl FreepikAdapter {
    pub fn new(
        api_url: String,
        api_key: String,
        max_attempts: u32,
        poll_interval: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            max_attempts,
            poll_interval,
        })
    }

    async fn read_envelope(response: reqwest::Response) -> PortResult<TaskData> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        let envelope: TaskEnvelope = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        envelope
            .data
            .ok_or_else(|| PortError::Unexpected("Freepik response has no data".to_string()))
    }

    async fn create_task(&self, prompt: &str) -> PortResult<String> {
        let response = self
            .client
            .post(&self.api_url)
            .header("x-freepik-api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&json!({
                "prompt": prompt,
                "num_images": 1,
                "aspect_ratio": "widescreen_16_9",
                "person_generation": "dont_allow",
                "safety_settings": "block_low_and_above",
            }))
            .send()
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        Self::read_envelope(response)
            .await?
            .task_id
            .ok_or_else(|| PortError::Unexpected("No task_id received from Freepik".to_string()))
    }

    async fn poll_task(&self, task_id: &str) -> PortResult<TaskData> {
        let response = self
            .client
            .get(format!("{}/{}", self.api_url, task_id))
            .header("x-freepik-api-key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;
        Self::read_envelope(response).await
    }
}

//=========================================================================================
// `ImageGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ImageGenerationService for FreepikAdapter {
    async fn generate_image(&self, prompt: &str) -> PortResult<String> {
        let task_id = self.create_task(prompt).await?;
        info!("[Freepik] Task created: {}", task_id);

        poll_until_ready(&task_id, self.max_attempts, self.poll_interval, || {
            self.poll_task(&task_id)
        })
        .await
    }
}

/// Polls up to `max_attempts` times, sleeping `interval` before each poll, until the
/// task yields an image URL or reaches a terminal failure.
async fn poll_until_ready<F, Fut>(
    task_id: &str,
    max_attempts: u32,
    interval: Duration,
    mut poll: F,
) -> PortResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortResult<TaskData>>,
{
    for attempt in 1..=max_attempts {
        tokio::time::sleep(interval).await;

        let data = poll().await?;
        match poll_state(&data) {
            PollState::Ready(url) => {
                info!("[Freepik] Image ready after {} polls", attempt);
                return Ok(url);
            }
            PollState::Failed(status) => {
                warn!("[Freepik] Task {} failed with status {}", task_id, status);
                return Err(PortError::Unexpected(format!(
                    "Image generation failed with status: {}",
                    status
                )));
            }
            PollState::Pending => {}
        }
    }

    Err(PortError::Timeout(format!(
        "Image generation timeout after {} attempts",
        max_attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(status: &str, generated: &[&str]) -> TaskData {
        TaskData {
            task_id: None,
            status: Some(status.to_string()),
            generated: generated.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn completed_task_yields_first_https_url() {
        let state = poll_state(&data(
            "COMPLETED",
            &["http://insecure/img.png", "https://cdn/img.png"],
        ));
        assert_eq!(state, PollState::Ready("https://cdn/img.png".to_string()));
    }

    #[test]
    fn terminal_failures_stop_polling() {
        for status in ["FAILED", "ERROR", "CANCELED"] {
            assert_eq!(poll_state(&data(status, &[])), PollState::Failed(status.to_string()));
        }
    }

    #[test]
    fn in_progress_or_urlless_tasks_keep_polling() {
        assert_eq!(poll_state(&data("IN_PROGRESS", &[])), PollState::Pending);
        assert_eq!(poll_state(&data("COMPLETED", &[])), PollState::Pending);
    }

    #[tokio::test]
    async fn polling_gives_up_after_max_attempts() {
        let mut polls = 0;
        let result = poll_until_ready("t-1", 3, Duration::ZERO, || {
            polls += 1;
            let pending = data("IN_PROGRESS", &[]);
            async move { Ok(pending) }
        })
        .await;

        assert!(matches!(result, Err(PortError::Timeout(_))));
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn polling_stops_once_the_image_is_ready() {
        let mut polls = 0;
        let result = poll_until_ready("t-1", 10, Duration::ZERO, || {
            polls += 1;
            let state = if polls < 2 {
                data("IN_PROGRESS", &[])
            } else {
                data("COMPLETED", &["https://cdn/img.png"])
            };
            async move { Ok(state) }
        })
        .await;

        assert_eq!(result, Ok("https://cdn/img.png".to_string()));
        assert_eq!(polls, 2);
    }

    #[tokio::test]
    async fn polling_stops_on_terminal_failures_and_errors() {
        let mut polls = 0;
        let failed = poll_until_ready("t-1", 10, Duration::ZERO, || {
            polls += 1;
            let state = data("FAILED", &[]);
            async move { Ok(state) }
        })
        .await;
        assert!(matches!(failed, Err(PortError::Unexpected(_))));
        assert_eq!(polls, 1);

        let unreachable = poll_until_ready("t-1", 10, Duration::ZERO, || async {
            Err(PortError::Unavailable("connection reset".to_string()))
        })
        .await;
        assert_eq!(
            unreachable,
            Err(PortError::Unavailable("connection reset".to_string()))
        );
    }

    #[test]
    fn envelope_parses_task_fields() {
        let envelope: TaskEnvelope =
            serde_json::from_str(r#"{"data":{"task_id":"t-1","status":"CREATED"}}"#).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.task_id.as_deref(), Some("t-1"));
        assert!(data.generated.is_empty());
    }
}
