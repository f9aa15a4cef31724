//! Test server management

use aws_config::{retry::RetryConfig, BehaviorVersion};
use aws_sdk_secretsmanager::config::{Credentials, Region};
use aws_sdk_secretsmanager::Client;
use axum::{routing::post, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::handlers::{handle_request, EmulatorState, RecordedRequest};
use crate::storage::{EmulatorOptions, SecretsStore};

/// A running in-process Secrets Manager emulator
pub struct TestServer {
    addr: SocketAddr,
    state: Arc<EmulatorState>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start an emulator with default options on a random local port
    pub async fn start() -> Result<Self, TestError> {
        Self::start_with(EmulatorOptions::default()).await
    }

    pub async fn start_with(options: EmulatorOptions) -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(TestError::Bind)?;
        let addr = listener.local_addr().map_err(TestError::Bind)?;

        let state = Arc::new(EmulatorState::new(options));
        let router = Router::new()
            .route("/", post(handle_request))
            .with_state(state.clone());

        info!(addr = %addr, "Starting Secrets Manager emulator");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                warn!(error = %e, "Secrets Manager emulator stopped");
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Get the base URL
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Direct access to the emulator's secrets
    pub fn store(&self) -> &SecretsStore {
        &self.state.store
    }

    /// Request bodies the emulator has received, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests()
    }

    /// Get an SDK client pointed at this emulator
    ///
    /// SDK retries are off so every operation maps to exactly one request.
    pub async fn client(&self) -> Client {
        let region = self.store().options().region.clone();
        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(self.url())
            .region(Region::new(region))
            .credentials_provider(Credentials::new(
                "test",
                "test",
                None,
                None,
                "secretkit-test",
            ))
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        Client::new(&config)
    }

    /// Reset all state
    pub fn reset(&self) {
        self.state.clear();
    }

    /// Stop the server
    pub fn stop(&self) {
        info!("Stopping Secrets Manager emulator");
        self.handle.abort();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Errors that can occur with test server
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("Failed to bind emulator listener: {0}")]
    Bind(#[source] std::io::Error),
}
