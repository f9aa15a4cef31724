//! Test utilities for secretkit
//!
//! Provides an in-process AWS Secrets Manager emulator so the real SDK
//! client can be exercised without network access or credentials:
//! - Start/stop the emulator on a random local port
//! - Hand out `aws_sdk_secretsmanager::Client`s pointed at it
//! - Inspect or reset emulator state between tests
//! - Inspect the request bodies the SDK actually sent
//! - Choose between scheduled (recovery window) and immediate deletion
//!
//! ## Usage
//!
//! ```rust,no_run
//! use secretkit_test::TestServer;
//!
//! #[tokio::test]
//! async fn test_secrets() {
//!     let server = TestServer::start().await.unwrap();
//!     let client = server.client().await;
//!
//!     // Use the client
//!     client.list_secrets().send().await.unwrap();
//!
//!     // Reset state between tests
//!     server.reset();
//! }
//! ```

pub mod handlers;
pub mod server;
pub mod storage;

pub use handlers::{handle_request, EmulatorState, RecordedRequest};
pub use server::{TestError, TestServer};
pub use storage::{DeletionPolicy, EmulatorOptions, SecretsStore, StoreError};

/// Page size used by ListSecrets when the request does not set MaxResults
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Route tracing output through the test harness; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secretkit=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
