//! Sound effect trigger
//!
//! Fires the gong on the mixer bridge with a one-shot `POST`. The bridge answers
//! with `{"status": "success"}` or `{"status": "...", "message": "..."}`.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum SoundEffectError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status} without a readable body")]
    BadResponse { status: reqwest::StatusCode },

    #[error("server rejected the sound effect: {}", message.as_deref().unwrap_or("no reason given"))]
    Rejected { message: Option<String> },
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the gong endpoint
#[derive(Clone, Debug)]
pub struct SoundEffectClient {
    endpoint: String,
    client: Client,
}

impl SoundEffectClient {
    /// Build a client posting to `endpoint` with the given request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SoundEffectError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn from_config(server: &ServerConfig) -> anyhow::Result<Self> {
        let endpoint = server.gong_endpoint()?;
        Ok(Self::new(
            endpoint,
            Duration::from_millis(server.request_timeout_ms),
        )?)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Play the gong once
    pub async fn trigger(&self) -> Result<(), SoundEffectError> {
        debug!("🔔 POST {}", self.endpoint);

        let response = self.client.post(&self.endpoint).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let parsed: TriggerResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Unreadable gong response ({}): {}", status, e);
                return Err(SoundEffectError::BadResponse { status });
            }
        };

        if parsed.status == "success" {
            info!("🔔 Gong played");
            Ok(())
        } else {
            Err(SoundEffectError::Rejected {
                message: parsed.message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> SoundEffectClient {
        SoundEffectClient::new(
            format!("{}/play-gong", server.url()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_trigger_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/play-gong")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "success"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client.trigger().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_trigger_rejected_carries_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/play-gong")
            .with_status(500)
            .with_body(r#"{"status": "error", "message": "gong.mp3 not found"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        match client.trigger().await {
            Err(SoundEffectError::Rejected { message }) => {
                assert_eq!(message.as_deref(), Some("gong.mp3 not found"))
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_trigger_rejected_without_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/play-gong")
            .with_body(r#"{"status": "busy"}"#)
            .create_async()
            .await;

        let err = client_for(&server).trigger().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "server rejected the sound effect: no reason given"
        );
    }

    #[tokio::test]
    async fn test_trigger_non_json_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/play-gong")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        match client_for(&server).trigger().await {
            Err(SoundEffectError::BadResponse { status }) => assert_eq!(status.as_u16(), 502),
            other => panic!("expected bad response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_trigger_unreachable_server() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = SoundEffectClient::new(
            format!("http://{}/play-gong", addr),
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(matches!(
            client.trigger().await,
            Err(SoundEffectError::Http(_))
        ));
    }

    #[test]
    fn test_from_config_builds_endpoint() {
        let server = ServerConfig {
            url: "https://mixer.local:8443".to_string(),
            ..ServerConfig::default()
        };
        let client = SoundEffectClient::from_config(&server).unwrap();
        assert_eq!(client.endpoint(), "https://mixer.local:8443/play-gong");
    }
}
