//! Capability implementations for the SDK client

use async_trait::async_trait;
use aws_sdk_secretsmanager::config::http::HttpResponse;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::{
    create_secret::{CreateSecretInput, CreateSecretOutput},
    delete_secret::{DeleteSecretInput, DeleteSecretOutput},
    get_secret_value::{GetSecretValueInput, GetSecretValueOutput},
    list_secrets::{ListSecretsInput, ListSecretsOutput},
    update_secret::{UpdateSecretInput, UpdateSecretOutput},
    RequestId,
};
use aws_sdk_secretsmanager::Client;
use secretkit_core::{Error, ErrorKind, Result};

use crate::api::{
    CreateSecretApi, DeleteSecretApi, GetSecretValueApi, ListSecretsApi, UpdateSecretApi,
};

#[async_trait]
impl CreateSecretApi for Client {
    async fn create_secret(&self, input: CreateSecretInput) -> Result<CreateSecretOutput> {
        Client::create_secret(self)
            .set_name(input.name)
            .set_client_request_token(input.client_request_token)
            .set_description(input.description)
            .set_kms_key_id(input.kms_key_id)
            .set_secret_binary(input.secret_binary)
            .set_secret_string(input.secret_string)
            .set_tags(input.tags)
            .set_add_replica_regions(input.add_replica_regions)
            .set_force_overwrite_replica_secret(input.force_overwrite_replica_secret)
            .send()
            .await
            .map_err(|err| from_sdk("CreateSecret", err))
    }
}

#[async_trait]
impl GetSecretValueApi for Client {
    async fn get_secret_value(&self, input: GetSecretValueInput) -> Result<GetSecretValueOutput> {
        Client::get_secret_value(self)
            .set_secret_id(input.secret_id)
            .set_version_id(input.version_id)
            .set_version_stage(input.version_stage)
            .send()
            .await
            .map_err(|err| from_sdk("GetSecretValue", err))
    }
}

#[async_trait]
impl UpdateSecretApi for Client {
    async fn update_secret(&self, input: UpdateSecretInput) -> Result<UpdateSecretOutput> {
        Client::update_secret(self)
            .set_secret_id(input.secret_id)
            .set_client_request_token(input.client_request_token)
            .set_description(input.description)
            .set_kms_key_id(input.kms_key_id)
            .set_secret_binary(input.secret_binary)
            .set_secret_string(input.secret_string)
            .send()
            .await
            .map_err(|err| from_sdk("UpdateSecret", err))
    }
}

#[async_trait]
impl ListSecretsApi for Client {
    async fn list_secrets(&self, input: ListSecretsInput) -> Result<ListSecretsOutput> {
        Client::list_secrets(self)
            .set_include_planned_deletion(input.include_planned_deletion)
            .set_max_results(input.max_results)
            .set_next_token(input.next_token)
            .set_filters(input.filters)
            .set_sort_order(input.sort_order)
            .set_sort_by(input.sort_by)
            .send()
            .await
            .map_err(|err| from_sdk("ListSecrets", err))
    }
}

#[async_trait]
impl DeleteSecretApi for Client {
    async fn delete_secret(&self, input: DeleteSecretInput) -> Result<DeleteSecretOutput> {
        Client::delete_secret(self)
            .set_secret_id(input.secret_id)
            .set_recovery_window_in_days(input.recovery_window_in_days)
            .set_force_delete_without_recovery(input.force_delete_without_recovery)
            .send()
            .await
            .map_err(|err| from_sdk("DeleteSecret", err))
    }
}

/// Convert an SDK failure, keeping the original error as the source
fn from_sdk<E>(operation: &'static str, err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let request_id = err.request_id().map(str::to_owned);

    let error = match &err {
        SdkError::ServiceError(context) => {
            let service_err = context.err();
            let message = service_err
                .message()
                .map_or_else(|| DisplayErrorContext(&err).to_string(), str::to_owned);
            match service_err.code() {
                Some(code) => Error::service(operation, code, message),
                None => Error::new(ErrorKind::Other, operation, message),
            }
        }
        SdkError::ConstructionFailure(_) => Error::new(
            ErrorKind::Validation,
            operation,
            DisplayErrorContext(&err).to_string(),
        ),
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            Error::new(
                ErrorKind::Transient,
                operation,
                DisplayErrorContext(&err).to_string(),
            )
        }
        _ => Error::new(
            ErrorKind::Other,
            operation,
            DisplayErrorContext(&err).to_string(),
        ),
    };

    let error = match request_id {
        Some(id) => error.with_request_id(id),
        None => error,
    };
    error.with_source(err)
}
