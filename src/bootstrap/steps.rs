//! The fixed three-step plan
//!
//! Building the commands is pure: [`plan`] turns a validated config into the
//! exact argument vectors, so ordering and argument shape are testable without
//! spawning anything.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{BootstrapConfig, Secret};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// `npm install --global aws-cdk@<version>`
    InstallCdk,
    /// `npm install --include=dev` inside the infra project
    InstallDependencies,
    /// `cdk synth --context ...`
    Synth,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::InstallCdk, Step::InstallDependencies, Step::Synth];

    pub fn label(self) -> &'static str {
        match self {
            Step::InstallCdk => "CDK install",
            Step::InstallDependencies => "dependency install",
            Step::Synth => "synth",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    Plain(String),
    /// `prefix` is printed as-is, `value` is redacted
    Sensitive { prefix: String, value: Secret },
}

impl CommandArg {
    pub fn expose(&self) -> String {
        match self {
            CommandArg::Plain(arg) => arg.clone(),
            CommandArg::Sensitive { prefix, value } => format!("{prefix}{}", value.expose()),
        }
    }
}

impl From<&str> for CommandArg {
    fn from(arg: &str) -> Self {
        CommandArg::Plain(arg.to_string())
    }
}

impl From<String> for CommandArg {
    fn from(arg: String) -> Self {
        CommandArg::Plain(arg)
    }
}

impl fmt::Display for CommandArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandArg::Plain(arg) => f.write_str(arg),
            CommandArg::Sensitive { prefix, value } => write!(f, "{prefix}{value}"),
        }
    }
}

/// One external command of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub step: Step,
    pub program: String,
    pub args: Vec<CommandArg>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    /// Arguments as handed to the child process, secrets included.
    pub fn argv(&self) -> Vec<String> {
        self.args.iter().map(CommandArg::expose).collect()
    }
}

/// Redacted command line, safe for logs.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Commands to run, in order, for the project in `infra_dir`.
pub fn plan(config: &BootstrapConfig, infra_dir: &Path) -> Vec<CommandSpec> {
    vec![
        install_cdk(config, infra_dir),
        install_dependencies(config, infra_dir),
        synth(config, infra_dir),
    ]
}

fn install_cdk(config: &BootstrapConfig, infra_dir: &Path) -> CommandSpec {
    let package = format!("{}@{}", config.tools.cdk_package, config.cdk_version);
    CommandSpec {
        step: Step::InstallCdk,
        program: config.tools.npm.clone(),
        args: vec!["install".into(), "--global".into(), package.into()],
        cwd: infra_dir.to_path_buf(),
    }
}

fn install_dependencies(config: &BootstrapConfig, infra_dir: &Path) -> CommandSpec {
    CommandSpec {
        step: Step::InstallDependencies,
        program: config.tools.npm.clone(),
        args: vec!["install".into(), "--include=dev".into()],
        cwd: infra_dir.to_path_buf(),
    }
}

fn synth(config: &BootstrapConfig, infra_dir: &Path) -> CommandSpec {
    let mut args = vec![CommandArg::from("synth")];
    for entry in config.context.entries() {
        args.push("--context".into());
        if entry.sensitive {
            args.push(CommandArg::Sensitive {
                prefix: format!("{}=", entry.key),
                value: Secret::new(entry.value),
            });
        } else {
            args.push(format!("{}={}", entry.key, entry.value).into());
        }
    }

    CommandSpec {
        step: Step::Synth,
        program: config.tools.cdk.clone(),
        args,
        cwd: infra_dir.to_path_buf(),
    }
}
