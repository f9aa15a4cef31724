//! HTTP handlers for the Secrets Manager emulator

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::storage::{EmulatorOptions, SecretsStore, StoreError};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const REQUEST_ID_HEADER: &str = "x-amzn-requestid";

/// State shared by the emulator handlers
pub struct EmulatorState {
    pub store: SecretsStore,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A request body as it arrived on the wire
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Operation name without the `secretsmanager.` prefix
    pub operation: String,
    pub body: serde_json::Value,
}

impl EmulatorState {
    pub fn new(options: EmulatorOptions) -> Self {
        Self {
            store: SecretsStore::new(options),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Forget all secrets and recorded requests
    pub fn clear(&self) {
        self.store.clear();
        self.requests.lock().clear();
    }

    fn record(&self, target: &str, body: &[u8]) {
        let body = serde_json::from_slice(body).unwrap_or(serde_json::Value::Null);
        self.requests.lock().push(RecordedRequest {
            operation: target.trim_start_matches("secretsmanager.").to_string(),
            body,
        });
    }
}

impl Default for EmulatorState {
    fn default() -> Self {
        Self::new(EmulatorOptions::default())
    }
}

/// Handle Secrets Manager requests based on X-Amz-Target header
pub async fn handle_request(
    State(state): State<Arc<EmulatorState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = headers
        .get("x-amz-target")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let request_id = Uuid::new_v4().to_string();

    info!(target = %target, request_id = %request_id, "Secrets Manager request");
    state.record(target, &body);

    let store = &state.store;
    let result = match target {
        "secretsmanager.CreateSecret" => parse(&body).and_then(|r| create_secret(store, r)),
        "secretsmanager.GetSecretValue" => parse(&body).and_then(|r| get_secret_value(store, r)),
        "secretsmanager.PutSecretValue" => parse(&body).and_then(|r| put_secret_value(store, r)),
        "secretsmanager.UpdateSecret" => parse(&body).and_then(|r| update_secret(store, r)),
        "secretsmanager.DeleteSecret" => parse(&body).and_then(|r| delete_secret(store, r)),
        "secretsmanager.RestoreSecret" => parse(&body).and_then(|r| restore_secret(store, r)),
        "secretsmanager.DescribeSecret" => parse(&body).and_then(|r| describe_secret(store, r)),
        "secretsmanager.ListSecrets" => parse(&body).and_then(|r| list_secrets(store, r)),
        _ => {
            warn!(target = %target, "Unknown Secrets Manager operation");
            Err(ApiError {
                code: "UnknownOperationException",
                message: format!("Unknown operation: {target}"),
            })
        }
    };

    match result {
        Ok(body) => respond(StatusCode::OK, request_id, body),
        Err(err) => {
            debug!(code = err.code, message = %err.message, "Secrets Manager error");
            let body = serde_json::json!({
                "__type": err.code,
                "message": err.message,
            });
            respond(StatusCode::BAD_REQUEST, request_id, body.to_string())
        }
    }
}

// === Request/Response types ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSecretRequest {
    name: String,
    description: Option<String>,
    kms_key_id: Option<String>,
    secret_string: Option<String>,
    secret_binary: Option<String>,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Tag {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSecretResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetSecretValueRequest {
    secret_id: String,
    version_id: Option<String>,
    version_stage: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetSecretValueResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    version_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_binary: Option<String>,
    version_stages: Vec<String>,
    created_date: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PutSecretValueRequest {
    secret_id: String,
    secret_string: Option<String>,
    secret_binary: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutSecretValueResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    version_id: String,
    version_stages: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateSecretRequest {
    secret_id: String,
    description: Option<String>,
    kms_key_id: Option<String>,
    secret_string: Option<String>,
    secret_binary: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateSecretResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteSecretRequest {
    secret_id: String,
    #[serde(default)]
    force_delete_without_recovery: bool,
    recovery_window_in_days: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteSecretResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    deletion_date: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecretIdRequest {
    secret_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RestoreSecretResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecretResponse {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kms_key_id: Option<String>,
    created_date: f64,
    last_changed_date: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_accessed_date: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_date: Option<f64>,
    version_ids_to_stages: HashMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListSecretsRequest {
    max_results: Option<i32>,
    next_token: Option<String>,
    #[serde(default)]
    include_planned_deletion: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListSecretsResponse {
    secret_list: Vec<SecretListEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SecretListEntry {
    #[serde(rename = "ARN")]
    arn: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    created_date: f64,
    last_changed_date: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_date: Option<f64>,
}

// === Operations ===

type ApiResult = Result<String, ApiError>;

fn create_secret(store: &SecretsStore, req: CreateSecretRequest) -> ApiResult {
    let tags: HashMap<String, String> = req.tags.into_iter().map(|t| (t.key, t.value)).collect();

    let secret = store.create_secret(
        &req.name,
        req.description,
        req.kms_key_id,
        req.secret_string,
        req.secret_binary,
        tags,
    )?;
    to_json(&CreateSecretResponse {
        arn: secret.arn,
        name: secret.name,
        version_id: secret.current_version_id,
    })
}

fn get_secret_value(store: &SecretsStore, req: GetSecretValueRequest) -> ApiResult {
    let (secret, version) = store.get_secret_value(
        &req.secret_id,
        req.version_id.as_deref(),
        req.version_stage.as_deref(),
    )?;
    to_json(&GetSecretValueResponse {
        arn: secret.arn,
        name: secret.name,
        version_id: version.version_id,
        secret_string: version.secret_string,
        secret_binary: version.secret_binary,
        version_stages: version.version_stages,
        created_date: epoch(version.created_date),
    })
}

fn put_secret_value(store: &SecretsStore, req: PutSecretValueRequest) -> ApiResult {
    let (secret, version) =
        store.put_secret_value(&req.secret_id, req.secret_string, req.secret_binary)?;
    to_json(&PutSecretValueResponse {
        arn: secret.arn,
        name: secret.name,
        version_id: version.version_id,
        version_stages: version.version_stages,
    })
}

fn update_secret(store: &SecretsStore, req: UpdateSecretRequest) -> ApiResult {
    let (secret, version) = store.update_secret(
        &req.secret_id,
        req.description,
        req.kms_key_id,
        req.secret_string,
        req.secret_binary,
    )?;
    to_json(&UpdateSecretResponse {
        arn: secret.arn,
        name: secret.name,
        version_id: version.map(|v| v.version_id),
    })
}

fn delete_secret(store: &SecretsStore, req: DeleteSecretRequest) -> ApiResult {
    let secret = store.delete_secret(
        &req.secret_id,
        req.force_delete_without_recovery,
        req.recovery_window_in_days,
    )?;
    to_json(&DeleteSecretResponse {
        arn: secret.arn,
        name: secret.name,
        deletion_date: secret.deleted_date.map(epoch),
    })
}

fn restore_secret(store: &SecretsStore, req: SecretIdRequest) -> ApiResult {
    let secret = store.restore_secret(&req.secret_id)?;
    to_json(&RestoreSecretResponse {
        arn: secret.arn,
        name: secret.name,
    })
}

fn describe_secret(store: &SecretsStore, req: SecretIdRequest) -> ApiResult {
    let secret = store.describe_secret(&req.secret_id)?;
    let version_ids_to_stages: HashMap<String, Vec<String>> = secret
        .versions
        .iter()
        .map(|(k, v)| (k.clone(), v.version_stages.clone()))
        .collect();

    to_json(&DescribeSecretResponse {
        arn: secret.arn,
        name: secret.name,
        description: secret.description,
        kms_key_id: secret.kms_key_id,
        created_date: epoch(secret.created_date),
        last_changed_date: epoch(secret.last_changed_date),
        last_accessed_date: secret.last_accessed_date.map(epoch),
        deleted_date: secret.deleted_date.map(epoch),
        version_ids_to_stages,
    })
}

fn list_secrets(store: &SecretsStore, req: ListSecretsRequest) -> ApiResult {
    let (secrets, next_token) = store.list_secrets(
        req.include_planned_deletion,
        req.max_results,
        req.next_token.as_deref(),
    )?;

    let secret_list = secrets
        .into_iter()
        .map(|s| SecretListEntry {
            arn: s.arn,
            name: s.name,
            description: s.description,
            created_date: epoch(s.created_date),
            last_changed_date: epoch(s.last_changed_date),
            deleted_date: s.deleted_date.map(epoch),
        })
        .collect();

    to_json(&ListSecretsResponse {
        secret_list,
        next_token,
    })
}

// === Helpers ===

/// Error sent back as a JSON 1.1 error document
#[derive(Debug)]
struct ApiError {
    code: &'static str,
    message: String,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Parse a request body; an empty body counts as `{}`
fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let body = if body.is_empty() { b"{}".as_slice() } else { body };
    serde_json::from_slice(body).map_err(|e| ApiError {
        code: "ValidationException",
        message: e.to_string(),
    })
}

fn to_json<T: Serialize>(body: &T) -> ApiResult {
    serde_json::to_string(body).map_err(|e| ApiError {
        code: "InternalServiceError",
        message: e.to_string(),
    })
}

#[allow(clippy::cast_precision_loss)]
fn epoch(date: DateTime<Utc>) -> f64 {
    date.timestamp_millis() as f64 / 1000.0
}

fn respond(status: StatusCode, request_id: String, body: String) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
            (HeaderName::from_static(REQUEST_ID_HEADER), request_id),
        ],
        body,
    )
        .into_response()
}
