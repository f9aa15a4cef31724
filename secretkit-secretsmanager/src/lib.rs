//! Secret operations over AWS Secrets Manager
//!
//! Five operations, each written against the one capability it needs:
//! - [`create_secret`] via [`CreateSecretApi`]
//! - [`get_secret`] via [`GetSecretValueApi`]
//! - [`update_secret`] via [`UpdateSecretApi`]
//! - [`list_secrets`] / [`list_secret_page`] via [`ListSecretsApi`]
//! - [`delete_secret`] via [`DeleteSecretApi`]
//!
//! [`aws_sdk_secretsmanager::Client`] implements all five traits, so a
//! configured client can be passed straight in. Tests substitute anything
//! that provides the single method in question.

pub mod api;
mod client;
pub mod operations;

pub use api::{CreateSecretApi, DeleteSecretApi, GetSecretValueApi, ListSecretsApi, UpdateSecretApi};
pub use operations::{
    create_secret, delete_secret, get_secret, list_secret_page, list_secrets, update_secret,
    SecretPage, SecretSummary,
};
pub use secretkit_core::{Error, ErrorKind, RequestContext, Result};
