//! CDK bootstrap library
//!
//! Installs a pinned AWS CDK CLI, installs the infra project's npm
//! dependencies and runs `cdk synth` with context taken from an explicit,
//! validated configuration. Used by the `cdk-bootstrap` binary; exposed as a
//! library so the pipeline can be driven with a fake command runner.

pub mod bootstrap;
pub mod config;
pub mod error;

pub use bootstrap::{Outcome, RunOptions, bootstrap};
pub use config::{BootstrapConfig, ConfigError, EnvSource, ProcessEnv, Secret, SynthContext, ToolSettings};
pub use error::BootstrapError;
