//! uplink configuration: the accounts files can be uploaded to.
//!
//! The config file is found through a resolution chain:
//!
//! 1. `--config <path>`: explicit per-run override
//! 2. `UPLINK_CONFIG` env var
//! 3. `config.json` in the working directory (where the payload operator keeps it)
//! 4. `~/.uplink/config.toml`
//!
//! Files ending in `.json` are parsed as JSON, anything else as TOML. Field
//! names are camelCase in both. A file may hold an `accounts` list or, in the
//! older single-account layout, one account's fields at the top level.

use std::{
    env, fmt, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::storage::{RemoteSettings, Target};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "UPLINK_CONFIG";

/// Environment variable holding the vendor key prefix.
pub const VENDOR_ENV: &str = "vendor";

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "no config file found (looked in {})\n\
         Create config.json with at minimum:\n\n\
         {{\"accounts\": [{{\"name\": \"local\", \"storageMode\": \"local\"}}]}}",
        searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    )]
    NotFound { searched: Vec<PathBuf> },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config at {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no accounts configured in {}", path.display())]
    NoAccounts { path: PathBuf },

    #[error("no account named '{name}' (available: {available})")]
    UnknownAccount { name: String, available: String },

    #[error("account '{account}' is missing required remote fields: {}", missing.join(", "))]
    MissingCredentials {
        account: String,
        missing: Vec<&'static str>,
    },
}

/// Where an account's uploads go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Local,
    #[default]
    Remote,
}

/// One upload destination from the config file.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Account {
    #[serde(default = "default_account_name")]
    pub name: String,
    #[serde(default)]
    pub storage_mode: StorageMode,
    pub bucket: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    /// Key prefix for this account, used when no vendor prefix is set.
    pub path: Option<String>,
    pub region: Option<String>,
    /// Mirror directory for local storage mode.
    pub local_path: Option<PathBuf>,
}

fn default_account_name() -> String {
    "default".to_string()
}

// Keeps the secret key out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("storage_mode", &self.storage_mode)
            .field("bucket", &self.bucket)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field(
                "aws_secret_access_key",
                &self.aws_secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("path", &self.path)
            .field("region", &self.region)
            .field("local_path", &self.local_path)
            .finish()
    }
}

impl Account {
    /// Resolves the account into a storage target.
    ///
    /// Remote accounts must carry a bucket and both keys. The region falls
    /// back to `AWS_REGION`, then `us-east-1`.
    pub fn target(&self) -> Result<Target, ConfigError> {
        match self.storage_mode {
            StorageMode::Local => Ok(Target::Local {
                path: self.local_path.clone(),
            }),
            StorageMode::Remote => {
                let field = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
                let bucket = field(&self.bucket);
                let access_key_id = field(&self.aws_access_key_id);
                let secret_access_key = field(&self.aws_secret_access_key);

                let mut missing = Vec::new();
                if bucket.is_none() {
                    missing.push("bucket");
                }
                if access_key_id.is_none() {
                    missing.push("awsAccessKeyId");
                }
                if secret_access_key.is_none() {
                    missing.push("awsSecretAccessKey");
                }

                match (bucket, access_key_id, secret_access_key) {
                    (Some(bucket), Some(access_key_id), Some(secret_access_key)) => {
                        let region = field(&self.region)
                            .or_else(|| env::var("AWS_REGION").ok().filter(|s| !s.is_empty()))
                            .unwrap_or_else(|| DEFAULT_REGION.to_string());
                        Ok(Target::Remote(RemoteSettings {
                            bucket,
                            access_key_id,
                            secret_access_key,
                            region,
                        }))
                    }
                    _ => Err(ConfigError::MissingCredentials {
                        account: self.name.clone(),
                        missing,
                    }),
                }
            }
        }
    }
}

/// The multi-account file shape. A file without `accounts` is one bare account.
#[derive(Deserialize)]
struct AccountsFile {
    accounts: Vec<Account>,
}

/// The loaded account list.
#[derive(Debug, Clone)]
pub struct Config {
    pub accounts: Vec<Account>,
}

impl Config {
    /// Finds the config file through the resolution chain.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        if let Ok(path) = env::var(CONFIG_ENV)
            && !path.is_empty()
        {
            return Ok(PathBuf::from(path));
        }

        let mut searched = vec![PathBuf::from("config.json")];
        if let Some(home) = dirs::home_dir() {
            searched.push(home.join(".uplink").join("config.toml"));
        }

        let found = searched.iter().find(|p| p.is_file()).cloned();
        found.ok_or(ConfigError::NotFound { searched })
    }

    /// Loads and validates the config at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    /// Parses config text; `path` picks the format and labels errors.
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        // The shape is picked by the `accounts` key so field errors surface as-is.
        let accounts = if is_json {
            let json_err = |source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            };
            let value: serde_json::Value = serde_json::from_str(contents).map_err(json_err)?;
            if value.get("accounts").is_some() {
                serde_json::from_value::<AccountsFile>(value)
                    .map_err(json_err)?
                    .accounts
            } else {
                vec![serde_json::from_value::<Account>(value).map_err(json_err)?]
            }
        } else {
            let toml_err = |source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            };
            let table: toml::Table = toml::from_str(contents).map_err(toml_err)?;
            if table.contains_key("accounts") {
                toml::Value::Table(table)
                    .try_into::<AccountsFile>()
                    .map_err(toml_err)?
                    .accounts
            } else {
                vec![toml::Value::Table(table).try_into::<Account>().map_err(toml_err)?]
            }
        };

        if accounts.is_empty() {
            return Err(ConfigError::NoAccounts {
                path: path.to_path_buf(),
            });
        }

        Ok(Self { accounts })
    }

    /// Picks an account by name, or the first one when no name is given.
    pub fn select(&self, name: Option<&str>) -> Result<&Account, ConfigError> {
        let Some(name) = name else {
            return self.accounts.first().ok_or(ConfigError::NoAccounts {
                path: PathBuf::new(),
            });
        };

        self.accounts
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ConfigError::UnknownAccount {
                name: name.to_string(),
                available: self
                    .accounts
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Resolves the key prefix: `--vendor`, then the `vendor` env var, then the account's `path`.
pub fn resolve_prefix(explicit: Option<&str>, account: &Account) -> Option<String> {
    resolve_prefix_from(explicit, env::var(VENDOR_ENV).ok(), account)
}

fn resolve_prefix_from(
    explicit: Option<&str>,
    vendor_env: Option<String>,
    account: &Account,
) -> Option<String> {
    explicit
        .map(str::to_string)
        .into_iter()
        .chain(vendor_env)
        .chain(account.path.clone())
        .find(|p| !p.trim_matches('/').is_empty())
}
