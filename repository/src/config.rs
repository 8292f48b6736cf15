use crate::error::{RepositoryError, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use model::contact::Status;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TABLE_NAME: &str = "contactsFredy";
pub const DEFAULT_ACTIVATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Capacity mode used when the contact table has to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Billing {
    #[default]
    OnDemand,
    Provisioned { read: i64, write: i64 },
}

impl FromStr for Billing {
    type Err = RepositoryError;

    /// Accepts `on-demand` or `provisioned:<read>:<write>`.
    fn from_str(s: &str) -> Result<Billing> {
        let invalid = || {
            RepositoryError::Configuration(format!(
                "TABLE_BILLING `{}` is neither `on-demand` nor `provisioned:<read>:<write>`",
                s
            ))
        };

        match s.split(':').collect::<Vec<_>>().as_slice() {
            ["on-demand"] => Ok(Billing::OnDemand),
            ["provisioned", read, write] => {
                let read = read.parse::<i64>().map_err(|_| invalid())?;
                let write = write.parse::<i64>().map_err(|_| invalid())?;
                if read < 1 || write < 1 {
                    return Err(invalid());
                }
                Ok(Billing::Provisioned { read, write })
            }
            _ => Err(invalid()),
        }
    }
}

/// Settings shared by the provisioner, writer and reader.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrarConfig {
    pub table_name: String,
    pub status: Status,
    pub billing: Billing,
    /// `None` skips waiting for a freshly created table to become active.
    pub activation_timeout: Option<Duration>,
    pub poll_interval: Duration,
    pub verify_after_insert: bool,
}

impl RegistrarConfig {
    pub fn new(table_name: impl Into<String>) -> RegistrarConfig {
        RegistrarConfig {
            table_name: table_name.into(),
            status: Status::default(),
            billing: Billing::default(),
            activation_timeout: Some(DEFAULT_ACTIVATION_TIMEOUT),
            poll_interval: DEFAULT_POLL_INTERVAL,
            verify_after_insert: true,
        }
    }

    pub fn from_env() -> Result<RegistrarConfig> {
        RegistrarConfig::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<RegistrarConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RegistrarConfig::new(
            optional(&lookup, "CONTACT_TABLE").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
        );

        if let Some(status) = optional(&lookup, "CONTACT_STATUS") {
            config.status = status
                .parse()
                .map_err(|err| RepositoryError::Configuration(format!("CONTACT_STATUS: {}", err)))?;
        }
        if let Some(billing) = optional(&lookup, "TABLE_BILLING") {
            config.billing = billing.parse()?;
        }
        if let Some(secs) = optional(&lookup, "TABLE_ACTIVATION_TIMEOUT_SECS") {
            config.activation_timeout = match number(&secs, "TABLE_ACTIVATION_TIMEOUT_SECS")? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            };
        }
        if let Some(millis) = optional(&lookup, "TABLE_POLL_INTERVAL_MILLIS") {
            config.poll_interval = match number(&millis, "TABLE_POLL_INTERVAL_MILLIS")? {
                0 => {
                    return Err(RepositoryError::Configuration(
                        "TABLE_POLL_INTERVAL_MILLIS must be at least 1".to_string(),
                    ))
                }
                millis => Duration::from_millis(millis),
            };
        }
        if let Some(verify) = optional(&lookup, "VERIFY_AFTER_INSERT") {
            config.verify_after_insert = verify.parse().map_err(|_| {
                RepositoryError::Configuration(format!(
                    "VERIFY_AFTER_INSERT `{}` is not `true` or `false`",
                    verify
                ))
            })?;
        }

        Ok(config)
    }
}

/// Region and optional endpoint override for the DynamoDB client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsSettings {
    pub region: String,
    pub endpoint_url: Option<String>,
}

impl AwsSettings {
    pub fn from_env() -> Result<AwsSettings> {
        AwsSettings::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<AwsSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(AwsSettings {
            region: required(&lookup, "AWS_REGION")?,
            endpoint_url: optional(&lookup, "AWS_ENDPOINT_URL"),
        })
    }

    pub async fn load(&self) -> SdkConfig {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));

        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        loader.load().await
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key)
        .ok_or_else(|| RepositoryError::Configuration(format!("{} is not set", key)))
}

fn number(value: &str, key: &str) -> Result<u64> {
    value.parse().map_err(|_| {
        RepositoryError::Configuration(format!("{} `{}` is not a non-negative integer", key, value))
    })
}
