//! Bootstrap configuration
//!
//! The runner never reads the process environment on its own. Everything it
//! needs is collected once at startup into a [`BootstrapConfig`] and passed
//! down by reference. Tool locations and tuning knobs come from an optional
//! TOML file ([`ToolSettings`]).

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::bootstrap::diagnostics::Verbosity;

pub const CDK_VERSION: &str = "CDK_VERSION";
pub const APPLICATION_NAME: &str = "APPLICATION_NAME";
pub const AWS_ACCOUNT_ID: &str = "AWS_ACCOUNT_ID";
pub const AWS_REGION: &str = "AWS_REGION";
pub const API_KEY: &str = "API_KEY";
pub const APPLICATION_TAG: &str = "APPLICATION_TAG";

/// Every variable the runner requires, in reporting order.
pub const REQUIRED_VARS: [&str; 6] = [
    CDK_VERSION,
    APPLICATION_NAME,
    AWS_ACCOUNT_ID,
    AWS_REGION,
    API_KEY,
    APPLICATION_TAG,
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing or empty environment variables: {}", .0.join(", "))]
    MissingVars(Vec<&'static str>),

    #[error("environment variables are not valid UTF-8: {}", .0.join(", "))]
    NotUnicode(Vec<&'static str>),

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Source of named values, normally the process environment.
pub trait EnvSource {
    fn var_os(&self, key: &str) -> Option<OsString>;
}

/// Reads from `std::env`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }
}

impl EnvSource for HashMap<String, String> {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.get(key).map(OsString::from)
    }
}

impl EnvSource for HashMap<String, OsString> {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.get(key).cloned()
    }
}

/// A string that never appears in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub const REDACTED: &'static str = "****";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw value. Only the command builder should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", Self::REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::REDACTED)
    }
}

/// The five values passed to `cdk synth` as `--context key=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthContext {
    pub application_name: String,
    pub account_id: String,
    pub region: String,
    pub api_key: Secret,
    pub application_tag: String,
}

/// One `key=value` pair of the synth context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextEntry<'a> {
    pub key: &'static str,
    pub value: &'a str,
    pub sensitive: bool,
}

impl ContextEntry<'_> {
    /// Value safe to print.
    pub fn display_value(&self) -> &str {
        if self.sensitive { Secret::REDACTED } else { self.value }
    }
}

impl SynthContext {
    /// Context entries in the order `cdk synth` receives them.
    pub fn entries(&self) -> [ContextEntry<'_>; 5] {
        let plain = |key, value| ContextEntry { key, value, sensitive: false };
        [
            plain("name", self.application_name.as_str()),
            plain("accountId", self.account_id.as_str()),
            plain("region", self.region.as_str()),
            ContextEntry {
                key: "apiKey",
                value: self.api_key.expose(),
                sensitive: true,
            },
            plain("applicationTag", self.application_tag.as_str()),
        ]
    }
}

fn default_infra_dir() -> String {
    "infra".to_string()
}

fn default_npm() -> String {
    "npm".to_string()
}

fn default_cdk() -> String {
    "cdk".to_string()
}

fn default_cdk_package() -> String {
    "aws-cdk".to_string()
}

/// On-disk TOML settings. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolSettings {
    /// Directory, relative to the working directory, that gates the run
    #[serde(default = "default_infra_dir")]
    pub infra_dir: String,
    #[serde(default = "default_npm")]
    pub npm: String,
    #[serde(default = "default_cdk")]
    pub cdk: String,
    /// npm package that provides the `cdk` executable
    #[serde(default = "default_cdk_package")]
    pub cdk_package: String,
    /// Per-step limit; unset means wait forever
    pub step_timeout_secs: Option<u64>,
    pub verbosity: Option<Verbosity>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            infra_dir: default_infra_dir(),
            npm: default_npm(),
            cdk: default_cdk(),
            cdk_package: default_cdk_package(),
            step_timeout_secs: None,
            verbosity: None,
        }
    }
}

impl ToolSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }
}

/// Fully validated input for one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Passed verbatim to `npm install --global <cdk_package>@<cdk_version>`
    pub cdk_version: String,
    pub context: SynthContext,
    pub tools: ToolSettings,
}

impl BootstrapConfig {
    /// Collect the six required values from `env`.
    ///
    /// Unset and whitespace-only values are rejected together, so a single
    /// error names every variable that needs fixing. Values that are set but
    /// not UTF-8 get their own error. Accepted values are kept exactly as
    /// given.
    pub fn from_env(env: &impl EnvSource, tools: ToolSettings) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut not_unicode = Vec::new();
        let mut required = |key: &'static str| match env.var_os(key).map(OsString::into_string) {
            Some(Ok(value)) if !value.trim().is_empty() => value,
            Some(Err(_)) => {
                not_unicode.push(key);
                String::new()
            }
            _ => {
                missing.push(key);
                String::new()
            }
        };

        let cdk_version = required(CDK_VERSION);
        let context = SynthContext {
            application_name: required(APPLICATION_NAME),
            account_id: required(AWS_ACCOUNT_ID),
            region: required(AWS_REGION),
            api_key: Secret::new(required(API_KEY)),
            application_tag: required(APPLICATION_TAG),
        };

        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }
        if !not_unicode.is_empty() {
            return Err(ConfigError::NotUnicode(not_unicode));
        }

        Ok(Self {
            cdk_version,
            context,
            tools,
        })
    }
}
