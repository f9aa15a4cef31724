//! The five secret operations
//!
//! Every function makes exactly one remote call through its capability and
//! maps the response into a plain value. Nothing here retries.

use aws_sdk_secretsmanager::operation::{
    create_secret::CreateSecretInput, delete_secret::DeleteSecretInput,
    get_secret_value::GetSecretValueInput, list_secrets::ListSecretsInput,
    update_secret::UpdateSecretInput,
};
use secretkit_core::{Error, ErrorKind, RequestContext, Result};
use tracing::{debug, warn};

use crate::api::{
    CreateSecretApi, DeleteSecretApi, GetSecretValueApi, ListSecretsApi, UpdateSecretApi,
};

/// Read-only descriptor of a listed secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSummary {
    pub arn: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// First page of a listing
///
/// `next_token` is set when the service had more results than it returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretPage {
    pub secrets: Vec<SecretSummary>,
    pub next_token: Option<String>,
}

impl SecretPage {
    pub fn is_truncated(&self) -> bool {
        self.next_token.is_some()
    }

    pub fn arns(&self) -> impl Iterator<Item = &str> {
        self.secrets.iter().map(|s| s.arn.as_str())
    }
}

/// Create a secret and return the ARN the service assigned to it
pub async fn create_secret<C>(
    ctx: &RequestContext,
    client: &C,
    name: &str,
    value: &str,
    description: &str,
) -> Result<String>
where
    C: CreateSecretApi + ?Sized,
{
    const OPERATION: &str = "CreateSecret";
    debug!(operation = OPERATION, name = %name, "Creating secret");

    let input = CreateSecretInput::builder()
        .name(name)
        .secret_string(value)
        .description(description)
        .build()
        .map_err(|e| invalid_input(OPERATION, e))?;

    let output = ctx
        .run(OPERATION, client.create_secret(input))
        .await
        .map_err(logged)?;

    output
        .arn()
        .map(str::to_owned)
        .ok_or_else(|| logged(missing_field(OPERATION, "ARN")))
}

/// Fetch the current string value of a secret by ARN or name
pub async fn get_secret<C>(ctx: &RequestContext, client: &C, secret_id: &str) -> Result<String>
where
    C: GetSecretValueApi + ?Sized,
{
    const OPERATION: &str = "GetSecretValue";
    debug!(operation = OPERATION, secret_id = %secret_id, "Fetching secret value");

    let input = GetSecretValueInput::builder()
        .secret_id(secret_id)
        .build()
        .map_err(|e| invalid_input(OPERATION, e))?;

    let output = ctx
        .run(OPERATION, client.get_secret_value(input))
        .await
        .map_err(logged)?;

    output
        .secret_string()
        .map(str::to_owned)
        .ok_or_else(|| logged(missing_field(OPERATION, "SecretString")))
}

/// Replace the value of a secret
pub async fn update_secret<C>(
    ctx: &RequestContext,
    client: &C,
    secret_id: &str,
    value: &str,
) -> Result<()>
where
    C: UpdateSecretApi + ?Sized,
{
    const OPERATION: &str = "UpdateSecret";
    debug!(operation = OPERATION, secret_id = %secret_id, "Updating secret");

    let input = UpdateSecretInput::builder()
        .secret_id(secret_id)
        .secret_string(value)
        .build()
        .map_err(|e| invalid_input(OPERATION, e))?;

    ctx.run(OPERATION, client.update_secret(input))
        .await
        .map_err(logged)?;
    Ok(())
}

/// ARNs of the secrets on the first result page
///
/// Only one page is read. When the service paginates, the result is a
/// partial view; use [`list_secret_page`] to see whether it was truncated.
pub async fn list_secrets<C>(ctx: &RequestContext, client: &C) -> Result<Vec<String>>
where
    C: ListSecretsApi + ?Sized,
{
    let page = list_secret_page(ctx, client).await?;
    Ok(page.secrets.into_iter().map(|s| s.arn).collect())
}

/// Descriptors of the secrets on the first result page
pub async fn list_secret_page<C>(ctx: &RequestContext, client: &C) -> Result<SecretPage>
where
    C: ListSecretsApi + ?Sized,
{
    const OPERATION: &str = "ListSecrets";
    debug!(operation = OPERATION, "Listing secrets");

    let input = ListSecretsInput::builder()
        .build()
        .map_err(|e| invalid_input(OPERATION, e))?;

    let output = ctx
        .run(OPERATION, client.list_secrets(input))
        .await
        .map_err(logged)?;

    let mut secrets = Vec::with_capacity(output.secret_list().len());
    for entry in output.secret_list() {
        let arn = entry
            .arn()
            .ok_or_else(|| logged(missing_field(OPERATION, "SecretList[].ARN")))?;
        secrets.push(SecretSummary {
            arn: arn.to_owned(),
            name: entry.name().map(str::to_owned),
            description: entry.description().map(str::to_owned),
        });
    }

    let next_token = output.next_token().map(str::to_owned);
    if next_token.is_some() {
        debug!(
            operation = OPERATION,
            count = secrets.len(),
            "Listing truncated after first page"
        );
    }

    Ok(SecretPage {
        secrets,
        next_token,
    })
}

/// Schedule a secret for deletion using the service's default recovery window
pub async fn delete_secret<C>(ctx: &RequestContext, client: &C, secret_id: &str) -> Result<()>
where
    C: DeleteSecretApi + ?Sized,
{
    const OPERATION: &str = "DeleteSecret";
    debug!(operation = OPERATION, secret_id = %secret_id, "Deleting secret");

    let input = DeleteSecretInput::builder()
        .secret_id(secret_id)
        .build()
        .map_err(|e| invalid_input(OPERATION, e))?;

    ctx.run(OPERATION, client.delete_secret(input))
        .await
        .map_err(logged)?;
    Ok(())
}

fn invalid_input<E>(operation: &'static str, err: E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    Error::new(ErrorKind::Validation, operation, err.to_string()).with_source(err)
}

fn missing_field(operation: &'static str, field: &str) -> Error {
    Error::new(
        ErrorKind::Other,
        operation,
        format!("response did not include {field}"),
    )
}

fn logged(err: Error) -> Error {
    warn!(
        operation = err.operation,
        kind = %err.kind,
        code = err.code().unwrap_or("-"),
        "Secret operation failed: {}",
        err.message
    );
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aws_sdk_secretsmanager::operation::{
        create_secret::CreateSecretOutput, delete_secret::DeleteSecretOutput,
        get_secret_value::GetSecretValueOutput, list_secrets::ListSecretsOutput,
        update_secret::UpdateSecretOutput,
    };
    use aws_sdk_secretsmanager::types::SecretListEntry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const ARN: &str = "arn:aws:secretsmanager:us-west-2:123456789012:secret:example-123456";

    /// Closure-backed double for one capability
    macro_rules! closure_mock {
        ($mock:ident, $api:ident, $method:ident, $input:ty, $output:ty) => {
            struct $mock<F>(F);

            impl<F> $mock<F>
            where
                F: Fn($input) -> Result<$output> + Send + Sync,
            {
                fn new(f: F) -> Self {
                    Self(f)
                }
            }

            #[async_trait]
            impl<F> $api for $mock<F>
            where
                F: Fn($input) -> Result<$output> + Send + Sync,
            {
                async fn $method(&self, input: $input) -> Result<$output> {
                    (self.0)(input)
                }
            }
        };
    }

    closure_mock!(MockCreateSecret, CreateSecretApi, create_secret, CreateSecretInput, CreateSecretOutput);
    closure_mock!(MockGetSecret, GetSecretValueApi, get_secret_value, GetSecretValueInput, GetSecretValueOutput);
    closure_mock!(MockUpdateSecret, UpdateSecretApi, update_secret, UpdateSecretInput, UpdateSecretOutput);
    closure_mock!(MockListSecrets, ListSecretsApi, list_secrets, ListSecretsInput, ListSecretsOutput);
    closure_mock!(MockDeleteSecret, DeleteSecretApi, delete_secret, DeleteSecretInput, DeleteSecretOutput);

    /// Never answers
    struct Stalled;

    #[async_trait]
    impl GetSecretValueApi for Stalled {
        async fn get_secret_value(&self, _input: GetSecretValueInput) -> Result<GetSecretValueOutput> {
            std::future::pending().await
        }
    }

    fn list_entry(name: &str) -> SecretListEntry {
        SecretListEntry::builder()
            .arn(format!(
                "arn:aws:secretsmanager:us-east-1:123456789012:secret:{name}-ABC123"
            ))
            .name(name)
            .description(format!("My test database secret: {name}"))
            .build()
    }

    #[tokio::test]
    async fn test_create_secret_sends_name_value_and_description() {
        let client = MockCreateSecret::new(|input| {
            assert_eq!(input.name.as_deref(), Some("example"));
            assert_eq!(input.secret_string.as_deref(), Some("value"));
            assert_eq!(input.description.as_deref(), Some("description"));
            assert!(input.secret_binary.is_none());
            Ok(CreateSecretOutput::builder().arn(ARN).name("example").build())
        });

        let arn = create_secret(&RequestContext::new(), &client, "example", "value", "description")
            .await
            .unwrap();
        assert_eq!(arn, ARN);
    }

    #[tokio::test]
    async fn test_create_secret_without_arn_is_an_error() {
        let client = MockCreateSecret::new(|_| Ok(CreateSecretOutput::builder().name("example").build()));

        let err = create_secret(&RequestContext::new(), &client, "example", "value", "desc")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
        assert!(err.message.contains("ARN"));
    }

    #[tokio::test]
    async fn test_create_secret_surfaces_service_error() {
        let client = MockCreateSecret::new(|_| {
            Err(Error::service(
                "CreateSecret",
                "ResourceExistsException",
                "The operation failed because the secret example already exists.",
            ))
        });

        let err = create_secret(&RequestContext::new(), &client, "example", "value", "desc")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.code(), Some("ResourceExistsException"));
    }

    #[tokio::test]
    async fn test_get_secret_returns_secret_string() {
        let client = MockGetSecret::new(|input| {
            assert_eq!(input.secret_id.as_deref(), Some("example"));
            assert!(input.version_id.is_none());
            assert!(input.version_stage.is_none());
            Ok(GetSecretValueOutput::builder()
                .arn(ARN)
                .name("example")
                .secret_string("my secret ....pss...")
                .build())
        });

        let value = get_secret(&RequestContext::new(), &client, "example")
            .await
            .unwrap();
        assert_eq!(value, "my secret ....pss...");
    }

    #[tokio::test]
    async fn test_get_binary_only_secret_is_an_error() {
        let client = MockGetSecret::new(|_| {
            Ok(GetSecretValueOutput::builder()
                .arn(ARN)
                .secret_binary(aws_sdk_secretsmanager::primitives::Blob::new(vec![0, 1, 2]))
                .build())
        });

        let err = get_secret(&RequestContext::new(), &client, ARN)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Other);
        assert!(err.message.contains("SecretString"));
    }

    #[tokio::test]
    async fn test_get_secret_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let client = MockGetSecret::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Err(Error::service(
                "GetSecretValue",
                "InternalServiceError",
                "try again later",
            ))
        });

        let err = get_secret(&RequestContext::new(), &client, "example")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_secret_times_out() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(20));

        let err = get_secret(&ctx, &Stalled, "example").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TimedOut);
        assert_eq!(err.operation, "GetSecretValue");
    }

    #[tokio::test]
    async fn test_get_secret_cancelled() {
        let ctx = RequestContext::new();
        let trigger = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = get_secret(&ctx, &Stalled, "example").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_update_secret_sends_id_and_value() {
        let client = MockUpdateSecret::new(|input| {
            assert_eq!(input.secret_id.as_deref(), Some("example"));
            assert_eq!(input.secret_string.as_deref(), Some("value"));
            assert!(input.description.is_none());
            Ok(UpdateSecretOutput::builder().arn(ARN).name("example").build())
        });

        update_secret(&RequestContext::new(), &client, "example", "value")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_secret_conflict() {
        let client = MockUpdateSecret::new(|_| {
            Err(Error::service(
                "UpdateSecret",
                "InvalidRequestException",
                "You can't perform this operation on the secret because it was marked for deletion.",
            ))
        });

        let err = update_secret(&RequestContext::new(), &client, "example", "value")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_list_secrets_returns_first_page_arns() {
        let client = MockListSecrets::new(|input| {
            assert!(input.next_token.is_none());
            assert!(input.max_results.is_none());
            assert!(input.filters.is_none());
            Ok(ListSecretsOutput::builder()
                .secret_list(list_entry("a"))
                .secret_list(list_entry("b"))
                .secret_list(list_entry("c"))
                .build())
        });

        let arns = list_secrets(&RequestContext::new(), &client).await.unwrap();
        assert_eq!(arns.len(), 3);
        assert!(arns[0].contains(":secret:a-"));
        assert!(arns[2].contains(":secret:c-"));
    }

    #[tokio::test]
    async fn test_list_secrets_empty() {
        let client = MockListSecrets::new(|_| Ok(ListSecretsOutput::builder().build()));

        let arns = list_secrets(&RequestContext::new(), &client).await.unwrap();
        assert!(arns.is_empty());
    }

    #[tokio::test]
    async fn test_list_secret_page_reports_truncation() {
        let client = MockListSecrets::new(|_| {
            Ok(ListSecretsOutput::builder()
                .secret_list(list_entry("a"))
                .next_token("page-2")
                .build())
        });

        let page = list_secret_page(&RequestContext::new(), &client)
            .await
            .unwrap();
        assert!(page.is_truncated());
        assert_eq!(page.secrets[0].name.as_deref(), Some("a"));
        assert_eq!(
            page.secrets[0].description.as_deref(),
            Some("My test database secret: a")
        );
        assert_eq!(page.arns().count(), 1);
    }

    #[tokio::test]
    async fn test_delete_secret_uses_service_defaults() {
        let client = MockDeleteSecret::new(|input| {
            assert_eq!(input.secret_id.as_deref(), Some("example"));
            assert!(input.recovery_window_in_days.is_none());
            assert!(input.force_delete_without_recovery.is_none());
            Ok(DeleteSecretOutput::builder().arn(ARN).name("example").build())
        });

        delete_secret(&RequestContext::new(), &client, "example")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_secret_not_found() {
        let client = MockDeleteSecret::new(|_| {
            Err(Error::service(
                "DeleteSecret",
                "ResourceNotFoundException",
                "Secrets Manager can't find the specified secret.",
            ))
        });

        let err = delete_secret(&RequestContext::new(), &client, "missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_operations_accept_trait_objects_and_arcs() {
        let client: Arc<dyn DeleteSecretApi> =
            Arc::new(MockDeleteSecret::new(|_| Ok(DeleteSecretOutput::builder().build())));

        delete_secret(&RequestContext::new(), &client, "example")
            .await
            .unwrap();
        delete_secret(&RequestContext::new(), client.as_ref(), "example")
            .await
            .unwrap();
    }
}
