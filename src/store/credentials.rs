//! Credentials Module
//!
//! The two accepted credential forms and the resolved storage account they
//! describe.

use std::fmt;

use crate::error::{CacheError, Result};

/// Account name used by `UseDevelopmentStorage=true`.
pub const DEVELOPMENT_ACCOUNT_NAME: &str = "devstoreaccount1";

/// Well-known key of the development storage account.
pub const DEVELOPMENT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

// == Credentials ==
/// How a cache instance authenticates against its table service.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Key=Value;Key=Value` connection string
    ConnectionString(String),
    /// Explicit account name and key
    AccountKey {
        account_name: String,
        account_key: String,
    },
}

impl Credentials {
    /// Builds the connection-string form.
    pub fn connection_string(value: impl Into<String>) -> Self {
        Credentials::ConnectionString(value.into())
    }

    /// Builds the account name + key form.
    pub fn account_key(account_name: impl Into<String>, account_key: impl Into<String>) -> Self {
        Credentials::AccountKey {
            account_name: account_name.into(),
            account_key: account_key.into(),
        }
    }

    /// Rejects blank fields without parsing anything.
    pub fn validate(&self) -> Result<()> {
        match self {
            Credentials::ConnectionString(value) => {
                require_non_blank(value, "connection string")
            }
            Credentials::AccountKey {
                account_name,
                account_key,
            } => {
                require_non_blank(account_name, "account name")?;
                require_non_blank(account_key, "account key")
            }
        }
    }

    // == Resolve ==
    /// Resolves the credentials into the storage account they name.
    pub fn resolve(&self) -> Result<StorageAccount> {
        self.validate()?;

        match self {
            Credentials::ConnectionString(value) => parse_connection_string(value),
            Credentials::AccountKey {
                account_name,
                account_key,
            } => Ok(StorageAccount {
                account_name: account_name.trim().to_string(),
                account_key: account_key.trim().to_string(),
                table_endpoint: None,
            }),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ConnectionString(_) => f
                .debug_tuple("ConnectionString")
                .field(&"<redacted>")
                .finish(),
            Credentials::AccountKey { account_name, .. } => f
                .debug_struct("AccountKey")
                .field("account_name", account_name)
                .field("account_key", &"<redacted>")
                .finish(),
        }
    }
}

// == Storage Account ==
/// A fully resolved storage account.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageAccount {
    pub account_name: String,
    pub account_key: String,
    /// Explicit table endpoint, when the connection string names one
    pub table_endpoint: Option<String>,
}

impl fmt::Debug for StorageAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAccount")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("table_endpoint", &self.table_endpoint)
            .finish()
    }
}

fn require_non_blank(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CacheError::Configuration(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(())
}

// == Connection String Parsing ==
fn parse_connection_string(value: &str) -> Result<StorageAccount> {
    let mut account_name = None;
    let mut account_key = None;
    let mut table_endpoint = None;
    let mut protocol = None;
    let mut endpoint_suffix = None;
    let mut development = false;

    for segment in value.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        // Account keys are base64 and may contain '=', so split on the first one
        let (name, setting) = segment.split_once('=').ok_or_else(|| {
            CacheError::Configuration(format!(
                "malformed connection string segment '{}'",
                segment
            ))
        })?;
        let setting = setting.trim().to_string();

        match name.trim().to_ascii_lowercase().as_str() {
            "accountname" => account_name = Some(setting),
            "accountkey" => account_key = Some(setting),
            "tableendpoint" => table_endpoint = Some(setting),
            "defaultendpointsprotocol" => protocol = Some(setting),
            "endpointsuffix" => endpoint_suffix = Some(setting),
            "usedevelopmentstorage" => development = setting.eq_ignore_ascii_case("true"),
            // Endpoints for other services are irrelevant to tables
            _ => {}
        }
    }

    if development {
        return Ok(StorageAccount {
            account_name: DEVELOPMENT_ACCOUNT_NAME.to_string(),
            account_key: DEVELOPMENT_ACCOUNT_KEY.to_string(),
            table_endpoint: Some(
                table_endpoint
                    .unwrap_or_else(|| "http://127.0.0.1:10002/devstoreaccount1".to_string()),
            ),
        });
    }

    let account_name = account_name.filter(|v| !v.is_empty()).ok_or_else(|| {
        CacheError::Configuration("connection string is missing AccountName".to_string())
    })?;
    let account_key = account_key.filter(|v| !v.is_empty()).ok_or_else(|| {
        CacheError::Configuration("connection string is missing AccountKey".to_string())
    })?;

    let table_endpoint = table_endpoint.or_else(|| {
        endpoint_suffix.map(|suffix| {
            format!(
                "{}://{}.table.{}",
                protocol.as_deref().unwrap_or("https"),
                account_name,
                suffix
            )
        })
    });

    Ok(StorageAccount {
        account_name,
        account_key,
        table_endpoint,
    })
}
