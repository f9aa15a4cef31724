//! Secrets Manager in-memory storage

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::DEFAULT_PAGE_SIZE;

const STAGE_CURRENT: &str = "AWSCURRENT";
const STAGE_PREVIOUS: &str = "AWSPREVIOUS";
const DEFAULT_RECOVERY_WINDOW_DAYS: i64 = 30;
const MAX_PAGE_SIZE: usize = 100;

/// What DeleteSecret does when the request does not force deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletionPolicy {
    /// Keep the secret for the recovery window, as the real service does
    #[default]
    Scheduled,
    /// Remove the secret at once
    Immediate,
}

#[derive(Debug, Clone)]
pub struct EmulatorOptions {
    pub region: String,
    pub account_id: String,
    pub deletion_policy: DeletionPolicy,
    /// ListSecrets page size when MaxResults is absent
    pub page_size: usize,
}

impl Default for EmulatorOptions {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account_id: "000000000000".to_string(),
            deletion_policy: DeletionPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A secret with its versions
#[derive(Debug, Clone)]
pub struct Secret {
    pub arn: String,
    pub name: String,
    pub description: Option<String>,
    /// Recorded only, nothing is encrypted
    pub kms_key_id: Option<String>,
    /// version_id -> SecretVersion
    pub versions: HashMap<String, SecretVersion>,
    /// Version labelled AWSCURRENT
    pub current_version_id: Option<String>,
    /// Version labelled AWSPREVIOUS
    pub previous_version_id: Option<String>,
    pub created_date: DateTime<Utc>,
    pub last_changed_date: DateTime<Utc>,
    pub last_accessed_date: Option<DateTime<Utc>>,
    /// When the secret will be purged, if scheduled for deletion
    pub deleted_date: Option<DateTime<Utc>>,
    pub tags: HashMap<String, String>,
    /// Creation order, used to keep listings stable
    sequence: u64,
}

impl Secret {
    pub fn is_scheduled_for_deletion(&self) -> bool {
        self.deleted_date.is_some()
    }

    /// Make `version` AWSCURRENT, demoting the old current to AWSPREVIOUS
    fn promote(&mut self, version: SecretVersion) {
        let current_vid = self.current_version_id.clone();
        let prev_vid = self.previous_version_id.clone();

        if let Some(ref cvid) = current_vid {
            if let Some(current_version) = self.versions.get_mut(cvid) {
                current_version.version_stages.retain(|s| s != STAGE_CURRENT);
                current_version.version_stages.push(STAGE_PREVIOUS.to_string());
            }
            if let Some(ref pvid) = prev_vid {
                if let Some(prev_version) = self.versions.get_mut(pvid) {
                    prev_version.version_stages.retain(|s| s != STAGE_PREVIOUS);
                }
            }
            self.previous_version_id = Some(cvid.clone());
        }

        self.current_version_id = Some(version.version_id.clone());
        self.last_changed_date = version.created_date;
        self.versions.insert(version.version_id.clone(), version);
    }
}

/// A version of a secret
#[derive(Debug, Clone)]
pub struct SecretVersion {
    pub version_id: String,
    pub secret_string: Option<String>,
    /// Base64 as received on the wire
    pub secret_binary: Option<String>,
    pub created_date: DateTime<Utc>,
    pub version_stages: Vec<String>,
}

impl SecretVersion {
    fn new(secret_string: Option<String>, secret_binary: Option<String>) -> Self {
        Self {
            version_id: Uuid::new_v4().to_string(),
            secret_string,
            secret_binary,
            created_date: Utc::now(),
            version_stages: vec![STAGE_CURRENT.to_string()],
        }
    }
}

/// In-memory secret store behind the emulator
#[derive(Debug, Default)]
pub struct SecretsStore {
    options: EmulatorOptions,
    /// Secrets indexed by name
    secrets: DashMap<String, Secret>,
    sequence: AtomicU64,
}

impl SecretsStore {
    pub fn new(options: EmulatorOptions) -> Self {
        Self {
            options,
            secrets: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &EmulatorOptions {
        &self.options
    }

    /// Create a new secret
    pub fn create_secret(
        &self,
        name: &str,
        description: Option<String>,
        kms_key_id: Option<String>,
        secret_string: Option<String>,
        secret_binary: Option<String>,
        tags: HashMap<String, String>,
    ) -> Result<Secret, StoreError> {
        validate_name(name)?;
        validate_value(secret_string.as_ref(), secret_binary.as_ref())?;

        let now = Utc::now();
        let arn = format!(
            "arn:aws:secretsmanager:{}:{}:secret:{}-{}",
            self.options.region,
            self.options.account_id,
            name,
            &Uuid::new_v4().simple().to_string()[..6]
        );

        let mut secret = Secret {
            arn,
            name: name.to_string(),
            description,
            kms_key_id,
            versions: HashMap::new(),
            current_version_id: None,
            previous_version_id: None,
            created_date: now,
            last_changed_date: now,
            last_accessed_date: None,
            deleted_date: None,
            tags,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
        };
        if secret_string.is_some() || secret_binary.is_some() {
            secret.promote(SecretVersion::new(secret_string, secret_binary));
        }

        match self.secrets.entry(name.to_string()) {
            Entry::Occupied(existing) if existing.get().is_scheduled_for_deletion() => {
                Err(StoreError::InvalidRequest(format!(
                    "You can't create this secret because a secret with this name ({name}) is already scheduled for deletion."
                )))
            }
            Entry::Occupied(_) => Err(StoreError::ResourceExists(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(secret.clone());
                Ok(secret)
            }
        }
    }

    /// Look up a secret by name or ARN, including ones scheduled for deletion
    pub fn get_secret(&self, secret_id: &str) -> Result<Secret, StoreError> {
        let name = self.resolve(secret_id)?;
        self.secrets
            .get(&name)
            .map(|s| s.clone())
            .ok_or_else(|| StoreError::ResourceNotFound(secret_id.to_string()))
    }

    /// Get secret value
    pub fn get_secret_value(
        &self,
        secret_id: &str,
        version_id: Option<&str>,
        version_stage: Option<&str>,
    ) -> Result<(Secret, SecretVersion), StoreError> {
        let name = self.resolve(secret_id)?;
        let mut secret = self
            .secrets
            .get_mut(&name)
            .ok_or_else(|| StoreError::ResourceNotFound(secret_id.to_string()))?;
        ensure_not_deleted(&secret)?;

        secret.last_accessed_date = Some(Utc::now());

        let version_id = if let Some(vid) = version_id {
            vid.to_string()
        } else {
            let stage = version_stage.unwrap_or(STAGE_CURRENT);
            let labelled = match stage {
                STAGE_CURRENT => secret.current_version_id.clone(),
                STAGE_PREVIOUS => secret.previous_version_id.clone(),
                _ => {
                    return Err(StoreError::InvalidParameter(format!(
                        "Unknown version stage: {stage}"
                    )))
                }
            };
            labelled.ok_or_else(|| {
                StoreError::ResourceNotFound(format!(
                    "{secret_id} has no value for staging label {stage}"
                ))
            })?
        };

        let version = secret.versions.get(&version_id).cloned().ok_or_else(|| {
            StoreError::ResourceNotFound(format!("{secret_id} version {version_id}"))
        })?;

        Ok((secret.clone(), version))
    }

    /// Put a new secret value
    pub fn put_secret_value(
        &self,
        secret_id: &str,
        secret_string: Option<String>,
        secret_binary: Option<String>,
    ) -> Result<(Secret, SecretVersion), StoreError> {
        validate_value(secret_string.as_ref(), secret_binary.as_ref())?;
        if secret_string.is_none() && secret_binary.is_none() {
            return Err(StoreError::InvalidParameter(
                "You must provide either SecretString or SecretBinary.".to_string(),
            ));
        }

        let name = self.resolve(secret_id)?;
        let mut secret = self
            .secrets
            .get_mut(&name)
            .ok_or_else(|| StoreError::ResourceNotFound(secret_id.to_string()))?;
        ensure_not_deleted(&secret)?;

        let version = SecretVersion::new(secret_string, secret_binary);
        secret.promote(version.clone());
        Ok((secret.clone(), version))
    }

    /// Update metadata and, when a value is given, add a new current version
    pub fn update_secret(
        &self,
        secret_id: &str,
        description: Option<String>,
        kms_key_id: Option<String>,
        secret_string: Option<String>,
        secret_binary: Option<String>,
    ) -> Result<(Secret, Option<SecretVersion>), StoreError> {
        validate_value(secret_string.as_ref(), secret_binary.as_ref())?;

        let name = self.resolve(secret_id)?;
        let mut secret = self
            .secrets
            .get_mut(&name)
            .ok_or_else(|| StoreError::ResourceNotFound(secret_id.to_string()))?;
        ensure_not_deleted(&secret)?;

        if description.is_some() {
            secret.description = description;
        }
        if kms_key_id.is_some() {
            secret.kms_key_id = kms_key_id;
        }

        let version = if secret_string.is_some() || secret_binary.is_some() {
            let version = SecretVersion::new(secret_string, secret_binary);
            secret.promote(version.clone());
            Some(version)
        } else {
            secret.last_changed_date = Utc::now();
            None
        };

        Ok((secret.clone(), version))
    }

    /// Delete a secret, either now or at the end of a recovery window
    pub fn delete_secret(
        &self,
        secret_id: &str,
        force_delete: bool,
        recovery_window_in_days: Option<i64>,
    ) -> Result<Secret, StoreError> {
        if force_delete && recovery_window_in_days.is_some() {
            return Err(StoreError::InvalidParameter(
                "You can't use ForceDeleteWithoutRecovery in conjunction with RecoveryWindowInDays."
                    .to_string(),
            ));
        }
        let window = recovery_window_in_days.unwrap_or(DEFAULT_RECOVERY_WINDOW_DAYS);
        if !(7..=30).contains(&window) {
            return Err(StoreError::InvalidParameter(
                "RecoveryWindowInDays value must be between 7 and 30 days (inclusive)."
                    .to_string(),
            ));
        }

        let name = self.resolve(secret_id)?;

        if force_delete || self.options.deletion_policy == DeletionPolicy::Immediate {
            return self
                .secrets
                .remove(&name)
                .map(|(_, mut secret)| {
                    secret.deleted_date = Some(Utc::now());
                    secret
                })
                .ok_or_else(|| StoreError::ResourceNotFound(secret_id.to_string()));
        }

        let mut secret = self
            .secrets
            .get_mut(&name)
            .ok_or_else(|| StoreError::ResourceNotFound(secret_id.to_string()))?;
        ensure_not_deleted(&secret)?;
        secret.deleted_date = Some(Utc::now() + Duration::days(window));
        Ok(secret.clone())
    }

    /// Cancel a scheduled deletion
    pub fn restore_secret(&self, secret_id: &str) -> Result<Secret, StoreError> {
        let name = self.resolve(secret_id)?;
        let mut secret = self
            .secrets
            .get_mut(&name)
            .ok_or_else(|| StoreError::ResourceNotFound(secret_id.to_string()))?;
        secret.deleted_date = None;
        Ok(secret.clone())
    }

    /// One page of secrets in creation order, plus the token for the next page
    pub fn list_secrets(
        &self,
        include_planned_deletion: bool,
        max_results: Option<i32>,
        next_token: Option<&str>,
    ) -> Result<(Vec<Secret>, Option<String>), StoreError> {
        let page_size = match max_results {
            Some(n) => usize::try_from(n)
                .ok()
                .filter(|n| (1..=MAX_PAGE_SIZE).contains(n))
                .ok_or_else(|| {
                    StoreError::InvalidParameter(format!(
                        "MaxResults must be between 1 and {MAX_PAGE_SIZE}"
                    ))
                })?,
            None => self.options.page_size.max(1),
        };
        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::InvalidParameter("Invalid NextToken".to_string()))?,
            None => 0,
        };

        let mut secrets: Vec<Secret> = self
            .secrets
            .iter()
            .filter(|r| include_planned_deletion || !r.value().is_scheduled_for_deletion())
            .map(|r| r.value().clone())
            .collect();
        secrets.sort_by_key(|s| s.sequence);

        let total = secrets.len();
        let page: Vec<Secret> = secrets.into_iter().skip(offset).take(page_size).collect();
        let next = offset + page.len();
        let next_token = (next < total).then(|| next.to_string());

        Ok((page, next_token))
    }

    /// Describe a secret
    pub fn describe_secret(&self, secret_id: &str) -> Result<Secret, StoreError> {
        self.get_secret(secret_id)
    }

    /// Drop every secret whose recovery window is running, as if it expired
    pub fn purge_scheduled(&self) -> usize {
        let before = self.secrets.len();
        self.secrets.retain(|_, s| !s.is_scheduled_for_deletion());
        before - self.secrets.len()
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn clear(&self) {
        self.secrets.clear();
    }

    /// Map a name or ARN to the storage key
    fn resolve(&self, secret_id: &str) -> Result<String, StoreError> {
        if self.secrets.contains_key(secret_id) {
            return Ok(secret_id.to_string());
        }
        if secret_id.starts_with("arn:") {
            let found = self
                .secrets
                .iter()
                .find(|r| r.value().arn == secret_id)
                .map(|r| r.key().clone());
            if let Some(name) = found {
                return Ok(name);
            }
        }
        Err(StoreError::ResourceNotFound(secret_id.to_string()))
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.len() <= 512
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/_+=.@-".contains(c));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidParameter(format!(
            "Invalid name. Must be a valid name containing alphanumeric characters, or any of the following: -/_+=.@! ({name})"
        )))
    }
}

fn validate_value(
    secret_string: Option<&String>,
    secret_binary: Option<&String>,
) -> Result<(), StoreError> {
    if secret_string.is_some() && secret_binary.is_some() {
        return Err(StoreError::InvalidParameter(
            "You can't specify both a binary secret value and a string secret value in the same secret."
                .to_string(),
        ));
    }
    Ok(())
}

fn ensure_not_deleted(secret: &Secret) -> Result<(), StoreError> {
    if secret.is_scheduled_for_deletion() {
        return Err(StoreError::InvalidRequest(
            "You can't perform this operation on the secret because it was marked for deletion."
                .to_string(),
        ));
    }
    Ok(())
}

/// Secrets Manager errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("The operation failed because the secret {0} already exists.")]
    ResourceExists(String),

    #[error("Secrets Manager can't find the specified secret: {0}")]
    ResourceNotFound(String),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0}")]
    InvalidRequest(String),
}

impl StoreError {
    /// Error code as sent in the `__type` field
    pub fn code(&self) -> &'static str {
        match self {
            Self::ResourceExists(_) => "ResourceExistsException",
            Self::ResourceNotFound(_) => "ResourceNotFoundException",
            Self::InvalidParameter(_) => "InvalidParameterException",
            Self::InvalidRequest(_) => "InvalidRequestException",
        }
    }
}
