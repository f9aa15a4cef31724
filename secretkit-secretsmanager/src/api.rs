//! Single-method capability traits
//!
//! Each trait exposes exactly one Secrets Manager call, taking the SDK's
//! input type and returning its output type.

use async_trait::async_trait;
use aws_sdk_secretsmanager::operation::{
    create_secret::{CreateSecretInput, CreateSecretOutput},
    delete_secret::{DeleteSecretInput, DeleteSecretOutput},
    get_secret_value::{GetSecretValueInput, GetSecretValueOutput},
    list_secrets::{ListSecretsInput, ListSecretsOutput},
    update_secret::{UpdateSecretInput, UpdateSecretOutput},
};
use secretkit_core::Result;
use std::sync::Arc;

/// Anything that can issue a `CreateSecret` request
#[async_trait]
pub trait CreateSecretApi: Send + Sync {
    async fn create_secret(&self, input: CreateSecretInput) -> Result<CreateSecretOutput>;
}

/// Anything that can issue a `GetSecretValue` request
#[async_trait]
pub trait GetSecretValueApi: Send + Sync {
    async fn get_secret_value(&self, input: GetSecretValueInput) -> Result<GetSecretValueOutput>;
}

/// Anything that can issue an `UpdateSecret` request
#[async_trait]
pub trait UpdateSecretApi: Send + Sync {
    async fn update_secret(&self, input: UpdateSecretInput) -> Result<UpdateSecretOutput>;
}

/// Anything that can issue a `ListSecrets` request
#[async_trait]
pub trait ListSecretsApi: Send + Sync {
    async fn list_secrets(&self, input: ListSecretsInput) -> Result<ListSecretsOutput>;
}

/// Anything that can issue a `DeleteSecret` request
#[async_trait]
pub trait DeleteSecretApi: Send + Sync {
    async fn delete_secret(&self, input: DeleteSecretInput) -> Result<DeleteSecretOutput>;
}

#[async_trait]
impl<T: CreateSecretApi + ?Sized> CreateSecretApi for Arc<T> {
    async fn create_secret(&self, input: CreateSecretInput) -> Result<CreateSecretOutput> {
        (**self).create_secret(input).await
    }
}

#[async_trait]
impl<T: GetSecretValueApi + ?Sized> GetSecretValueApi for Arc<T> {
    async fn get_secret_value(&self, input: GetSecretValueInput) -> Result<GetSecretValueOutput> {
        (**self).get_secret_value(input).await
    }
}

#[async_trait]
impl<T: UpdateSecretApi + ?Sized> UpdateSecretApi for Arc<T> {
    async fn update_secret(&self, input: UpdateSecretInput) -> Result<UpdateSecretOutput> {
        (**self).update_secret(input).await
    }
}

#[async_trait]
impl<T: ListSecretsApi + ?Sized> ListSecretsApi for Arc<T> {
    async fn list_secrets(&self, input: ListSecretsInput) -> Result<ListSecretsOutput> {
        (**self).list_secrets(input).await
    }
}

#[async_trait]
impl<T: DeleteSecretApi + ?Sized> DeleteSecretApi for Arc<T> {
    async fn delete_secret(&self, input: DeleteSecretInput) -> Result<DeleteSecretOutput> {
        (**self).delete_secret(input).await
    }
}
