//! services/api/src/adapters/airia.rs
//!
//! This module contains the adapter for the Airia pipeline execution API.
//! It implements the `LearningContentService` and `QuizFeedbackService` ports.

use std::time::Duration;

use async_trait::async_trait;
use elearning_core::domain::FeedbackPayload;
use elearning_core::ports::{
    LearningContentService, PortError, PortResult, QuizFeedbackService,
};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that runs Airia pipelines for learning content and quiz feedback.
#[derive(Clone)]
pub struct AiriaAdapter {
    client: Client,
    content_url: String,
    feedback_url: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PipelineRequest<'a> {
    user_input: &'a str,
    async_output: bool,
}

impl AiriaAdapter {
    /// Creates a new `AiriaAdapter` whose requests give up after `timeout`.
    pub fn new(
        content_url: String,
        feedback_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            content_url,
            feedback_url,
            api_key,
        })
    }

    /// Runs a pipeline and returns the raw body of a 2xx response.
    async fn post(&self, url: &str, user_input: &str) -> PortResult<String> {
        let response = self
            .client
            .post(url)
            .header("X-API-KEY", &self.api_key)
            .json(&PipelineRequest {
                user_input,
                async_output: false,
            })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            error!("Airia API Error - Status: {} Body: {}", status, body);
            return Err(PortError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

fn map_transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout(e.to_string())
    } else {
        PortError::Unavailable(e.to_string())
    }
}

/// Airia wraps the pipeline output in a `result` string holding JSON; unwrap it
/// when present and pass any other shape through.
pub fn unwrap_pipeline_result(value: Value) -> PortResult<Value> {
    match value.get("result").and_then(Value::as_str) {
        Some(result) => {
            debug!("Parsing result string from Airia...");
            serde_json::from_str(result)
                .map_err(|e| PortError::Unexpected(format!("Invalid pipeline result: {}", e)))
        }
        None => Ok(value),
    }
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl LearningContentService for AiriaAdapter {
    async fn request_learning(&self, user_input: &str) -> PortResult<Value> {
        info!("Forwarding request to Airia: {}", user_input);
        let body = self.post(&self.content_url, user_input).await?;
        info!("Received response from Airia");
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| PortError::Unexpected(format!("Invalid JSON from Airia: {}", e)))?;
        unwrap_pipeline_result(value)
    }
}

#[async_trait]
impl QuizFeedbackService for AiriaAdapter {
    async fn send_quiz_feedback(&self, payload: &FeedbackPayload) -> PortResult<()> {
        let user_input =
            serde_json::to_string(payload).map_err(|e| PortError::Unexpected(e.to_string()))?;
        // Any 2xx counts as delivered; the body is not inspected.
        self.post(&self.feedback_url, &user_input).await?;
        Ok(())
    }
}
