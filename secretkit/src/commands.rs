//! Subcommands, including the end-to-end demo

use anyhow::Context;
use clap::Subcommand;
use secretkit_core::RequestContext;
use secretkit_secretsmanager::{
    create_secret, delete_secret, get_secret, list_secrets, update_secret, CreateSecretApi,
    DeleteSecretApi, GetSecretValueApi, ListSecretsApi, UpdateSecretApi,
};
use std::io::Write;
use tracing::info;

const DEMO_VALUE: &str = "some secret value";
const DEMO_UPDATED_VALUE: &str = "correct horse battery staple";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a secret and print its ARN
    Create {
        name: String,
        value: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Print the current value of a secret (ARN or name)
    Get { secret_id: String },
    /// Replace the value of a secret
    Update { secret_id: String, value: String },
    /// Print the ARNs on the first page of secrets
    List,
    /// Schedule a secret for deletion
    Delete { secret_id: String },
    /// Create, read, update, list and delete a throwaway secret
    Demo {
        /// Prefix for the generated secret name
        #[arg(long, default_value = "sampleSecret")]
        prefix: String,
    },
}

/// Everything the subcommands need from a client
pub trait SecretsClient:
    CreateSecretApi + GetSecretValueApi + UpdateSecretApi + ListSecretsApi + DeleteSecretApi
{
}

impl<T> SecretsClient for T where
    T: CreateSecretApi + GetSecretValueApi + UpdateSecretApi + ListSecretsApi + DeleteSecretApi
{
}

pub async fn run<C, W>(
    command: Command,
    ctx: &RequestContext,
    client: &C,
    out: &mut W,
) -> anyhow::Result<()>
where
    C: SecretsClient,
    W: Write,
{
    match command {
        Command::Create {
            name,
            value,
            description,
        } => {
            let arn = create_secret(ctx, client, &name, &value, &description)
                .await
                .context("Couldn't create secret!")?;
            writeln!(out, "{arn}")?;
        }
        Command::Get { secret_id } => {
            let value = get_secret(ctx, client, &secret_id)
                .await
                .context("Couldn't get secret value!")?;
            writeln!(out, "{value}")?;
        }
        Command::Update { secret_id, value } => {
            update_secret(ctx, client, &secret_id, &value)
                .await
                .context("Couldn't update secret!")?;
            writeln!(out, "The secret has been updated.")?;
        }
        Command::List => {
            let ids = list_secrets(ctx, client)
                .await
                .context("Couldn't list secrets!")?;
            for id in ids {
                writeln!(out, "{id}")?;
            }
        }
        Command::Delete { secret_id } => {
            delete_secret(ctx, client, &secret_id)
                .await
                .context("Couldn't delete secret!")?;
            writeln!(out, "Deleted the secret {secret_id}")?;
        }
        Command::Demo { prefix } => {
            let name = format!("{prefix}{}", uuid::Uuid::new_v4());
            demo(ctx, client, &name, out).await?;
        }
    }
    Ok(())
}

/// Walk one secret through its whole lifecycle, printing each step
pub async fn demo<C, W>(
    ctx: &RequestContext,
    client: &C,
    name: &str,
    out: &mut W,
) -> anyhow::Result<()>
where
    C: SecretsClient,
    W: Write,
{
    info!(name = %name, "Running demo");

    let arn = create_secret(ctx, client, name, DEMO_VALUE, "desc")
        .await
        .context("Couldn't create secret!")?;
    writeln!(out, "Created the arn {arn}")?;

    let value = get_secret(ctx, client, &arn)
        .await
        .context("Couldn't get secret value!")?;
    writeln!(out, "it has the value \"{value}\"")?;

    // Names work wherever ARNs do
    let value = get_secret(ctx, client, name)
        .await
        .context("Couldn't get secret value!")?;
    writeln!(out, "it has the value \"{value}\"")?;

    update_secret(ctx, client, &arn, DEMO_UPDATED_VALUE)
        .await
        .context("Couldn't update secret!")?;
    writeln!(out, "The secret has been updated.")?;

    let value = get_secret(ctx, client, &arn)
        .await
        .context("Couldn't get secret value!")?;
    writeln!(out, "it has the value \"{value}\"")?;

    let ids = list_secrets(ctx, client)
        .await
        .context("Couldn't list secrets!")?;
    writeln!(
        out,
        "There are {} secrets -- here's their IDs: ",
        ids.len()
    )?;
    for id in &ids {
        writeln!(out, "{id}")?;
    }

    delete_secret(ctx, client, &arn)
        .await
        .context("Couldn't delete secret!")?;
    writeln!(out, "Deleted the secret with arn {arn}")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secretkit_test::TestServer;

    fn output(buf: Vec<u8>) -> Vec<String> {
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[tokio::test]
    async fn test_demo_walkthrough() {
        let server = TestServer::start().await.unwrap();
        let client = server.client().await;
        let mut out = Vec::new();

        demo(&RequestContext::new(), &client, "sampleSecret-test", &mut out)
            .await
            .unwrap();

        let lines = output(out);
        assert!(lines[0].starts_with("Created the arn arn:aws:secretsmanager:"));
        assert_eq!(lines[1], "it has the value \"some secret value\"");
        assert_eq!(lines[2], "it has the value \"some secret value\"");
        assert_eq!(lines[3], "The secret has been updated.");
        assert_eq!(lines[4], "it has the value \"correct horse battery staple\"");
        assert_eq!(lines[5], "There are 1 secrets -- here's their IDs: ");
        assert!(lines[7].starts_with("Deleted the secret with arn "));

        let secret = server.store().get_secret("sampleSecret-test").unwrap();
        assert!(secret.is_scheduled_for_deletion());
    }

    #[tokio::test]
    async fn test_demo_aborts_on_first_error() {
        let server = TestServer::start().await.unwrap();
        let client = server.client().await;
        let ctx = RequestContext::new();

        create_secret(&ctx, &client, "taken", "v", "d").await.unwrap();

        let mut out = Vec::new();
        let err = demo(&ctx, &client, "taken", &mut out).await.unwrap_err();
        assert_eq!(err.to_string(), "Couldn't create secret!");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_subcommands() {
        let server = TestServer::start().await.unwrap();
        let client = server.client().await;
        let ctx = RequestContext::new();

        let mut out = Vec::new();
        run(
            Command::Create {
                name: "cli".to_string(),
                value: "one".to_string(),
                description: String::new(),
            },
            &ctx,
            &client,
            &mut out,
        )
        .await
        .unwrap();
        let arn = output(out).remove(0);

        let mut out = Vec::new();
        run(
            Command::Update {
                secret_id: "cli".to_string(),
                value: "two".to_string(),
            },
            &ctx,
            &client,
            &mut out,
        )
        .await
        .unwrap();

        let mut out = Vec::new();
        run(
            Command::Get {
                secret_id: arn.clone(),
            },
            &ctx,
            &client,
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(output(out), ["two"]);

        let mut out = Vec::new();
        run(Command::List, &ctx, &client, &mut out).await.unwrap();
        assert_eq!(output(out), [arn.clone()]);

        let mut out = Vec::new();
        run(Command::Delete { secret_id: arn }, &ctx, &client, &mut out)
            .await
            .unwrap();
        assert!(server.store().list_secrets(false, None, None).unwrap().0.is_empty());
    }
}
