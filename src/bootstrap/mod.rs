//! Bootstrap pipeline
//!
//! Gate on the infra directory, then run the three planned commands in
//! order. The first failing step ends the run; nothing is retried or rolled
//! back.

pub mod diagnostics;
pub mod executor;
pub mod steps;

use std::path::{Path, PathBuf};

use log::{debug, error, info};
use termcolor::WriteColor;

use crate::config::{BootstrapConfig, EnvSource, ToolSettings};
use crate::error::BootstrapError;
use diagnostics::Reporter;
use executor::{CommandRunner, StepStatus};
use steps::{CommandSpec, Step};

/// Options for a single bootstrap run, mostly from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub work_dir: PathBuf,
    pub tools: ToolSettings,
    /// Print the plan without running it
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(work_dir: impl Into<PathBuf>, tools: ToolSettings) -> Self {
        Self {
            work_dir: work_dir.into(),
            tools,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No infra directory; nothing was run
    Skipped { infra_dir: PathBuf },
    /// Dry run; the commands that would have run
    Planned(Vec<CommandSpec>),
    Completed,
}

/// `<work_dir>/<name>` if it exists and is a directory.
pub fn locate_infra(work_dir: &Path, name: &str) -> Option<PathBuf> {
    let candidate = work_dir.join(name);
    candidate.is_dir().then_some(candidate)
}

/// Run a complete bootstrap.
///
/// An absent infra directory is a successful no-op, not an error, and the
/// environment is not consulted at all. Otherwise `env` is read exactly once
/// and validated before any command starts.
pub async fn bootstrap<E, R, W>(
    options: &RunOptions,
    env: &E,
    runner: &R,
    reporter: &mut Reporter<W>,
) -> Result<Outcome, BootstrapError>
where
    E: EnvSource,
    R: CommandRunner,
    W: WriteColor,
{
    let Some(infra_dir) = locate_infra(&options.work_dir, &options.tools.infra_dir) else {
        let infra_dir = options.work_dir.join(&options.tools.infra_dir);
        debug!("No {} directory, nothing to do", infra_dir.display());
        return Ok(Outcome::Skipped { infra_dir });
    };

    let config = BootstrapConfig::from_env(env, options.tools.clone())?;

    let commands = steps::plan(&config, &infra_dir);
    if options.dry_run {
        reporter.dry_run(&commands);
        return Ok(Outcome::Planned(commands));
    }

    run_plan(&config, &commands, runner, reporter).await?;
    Ok(Outcome::Completed)
}

/// Execute `commands` in order, stopping at the first failure.
pub async fn run_plan<R, W>(
    config: &BootstrapConfig,
    commands: &[CommandSpec],
    runner: &R,
    reporter: &mut Reporter<W>,
) -> Result<(), BootstrapError>
where
    R: CommandRunner,
    W: WriteColor,
{
    for command in commands {
        match command.step {
            Step::InstallCdk => reporter.announce_version(&config.cdk_version),
            Step::Synth => reporter.context(&config.context),
            Step::InstallDependencies => {}
        }
        reporter.step_started(command);
        info!("Running {command} in {}", command.cwd.display());

        match runner.run(command).await? {
            StepStatus::Success => info!("{} finished", command.step),
            StepStatus::Failed(code) => {
                error!("{} exited with status {code}", command.step);
                return Err(BootstrapError::StepFailed {
                    step: command.step,
                    code,
                });
            }
            StepStatus::Signalled(signal) => {
                error!("{} killed by signal {signal}", command.step);
                return Err(BootstrapError::Signalled {
                    step: command.step,
                    signal,
                });
            }
        }
    }

    reporter.finished();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::fs;
    use std::sync::Mutex;

    use termcolor::Buffer;

    use super::*;
    use crate::config::tests::sample_env;
    use crate::config::{API_KEY, ConfigError};
    use super::diagnostics::Verbosity;

    /// Records every command and answers with scripted statuses.
    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<CommandSpec>>,
        statuses: Mutex<VecDeque<StepStatus>>,
    }

    impl RecordingRunner {
        fn with_statuses(statuses: impl IntoIterator<Item = StepStatus>) -> Self {
            Self {
                calls: Mutex::default(),
                statuses: Mutex::new(statuses.into_iter().collect()),
            }
        }

        fn steps(&self) -> Vec<Step> {
            self.calls.lock().unwrap().iter().map(|c| c.step).collect()
        }
    }

    impl CommandRunner for RecordingRunner {
        async fn run(&self, command: &CommandSpec) -> Result<StepStatus, BootstrapError> {
            self.calls.lock().unwrap().push(command.clone());
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(StepStatus::Success))
        }
    }

    fn with_infra() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("infra")).unwrap();
        dir
    }

    fn options(dir: &Path) -> RunOptions {
        RunOptions::new(dir, ToolSettings::default())
    }

    fn reporter() -> Reporter<Buffer> {
        Reporter::new(Buffer::no_color(), Verbosity::Plain)
    }

    fn output(reporter: Reporter<Buffer>) -> String {
        String::from_utf8(reporter.into_inner().into_inner()).unwrap()
    }

    #[tokio::test]
    async fn missing_infra_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::default();
        let mut reporter = reporter();

        let outcome = bootstrap(&options(dir.path()), &sample_env(), &runner, &mut reporter)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Skipped {
                infra_dir: dir.path().join("infra")
            }
        );
        assert!(runner.steps().is_empty());
        assert!(output(reporter).is_empty());
    }

    #[tokio::test]
    async fn infra_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("infra"), "not a dir").unwrap();
        let runner = RecordingRunner::default();

        let outcome = bootstrap(&options(dir.path()), &sample_env(), &runner, &mut reporter())
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Skipped { .. }));
        assert!(runner.steps().is_empty());
    }

    #[tokio::test]
    async fn runs_all_steps_in_infra_dir() {
        let dir = with_infra();
        let runner = RecordingRunner::default();
        let mut reporter = reporter();

        let outcome = bootstrap(&options(dir.path()), &sample_env(), &runner, &mut reporter)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(runner.steps(), Step::ALL);

        let calls = runner.calls.lock().unwrap();
        assert!(calls.iter().all(|c| c.cwd == dir.path().join("infra")));
        assert_eq!(
            calls[2].argv()[1..].to_vec(),
            [
                "--context",
                "name=orders",
                "--context",
                "accountId=123456789012",
                "--context",
                "region=eu-west-2",
                "--context",
                "apiKey=sk-live-abc123",
                "--context",
                "applicationTag=v1.4.2",
            ]
        );
        drop(calls);

        let out = output(reporter);
        assert!(out.starts_with("Installing CDK version 2.100.0\n"));
        assert!(out.contains("apiKey: ****\n"));
        assert!(!out.contains("sk-live-abc123"));
    }

    #[tokio::test]
    async fn failed_cdk_install_stops_the_run() {
        let dir = with_infra();
        let runner = RecordingRunner::with_statuses([StepStatus::Failed(7)]);

        let err = bootstrap(&options(dir.path()), &sample_env(), &runner, &mut reporter())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::StepFailed {
                step: Step::InstallCdk,
                code: 7
            }
        ));
        assert_eq!(err.exit_code(), 7);
        assert_eq!(runner.steps(), [Step::InstallCdk]);
    }

    #[tokio::test]
    async fn failed_dependency_install_skips_synth() {
        let dir = with_infra();
        let runner = RecordingRunner::with_statuses([StepStatus::Success, StepStatus::Failed(1)]);

        let err = bootstrap(&options(dir.path()), &sample_env(), &runner, &mut reporter())
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert_eq!(runner.steps(), [Step::InstallCdk, Step::InstallDependencies]);
    }

    #[tokio::test]
    async fn synth_status_is_the_run_status() {
        let dir = with_infra();
        let runner = RecordingRunner::with_statuses([
            StepStatus::Success,
            StepStatus::Success,
            StepStatus::Signalled(9),
        ]);

        let err = bootstrap(&options(dir.path()), &sample_env(), &runner, &mut reporter())
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 137);
        assert_eq!(runner.steps(), Step::ALL);
    }

    #[tokio::test]
    async fn missing_env_is_rejected_before_anything_runs() {
        let dir = with_infra();
        let mut env = sample_env();
        env.remove(API_KEY);
        let runner = RecordingRunner::default();

        let err = bootstrap(&options(dir.path()), &env, &runner, &mut reporter())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::Config(ConfigError::MissingVars(ref names)) if names == &[API_KEY]
        ));
        assert!(runner.steps().is_empty());
    }

    #[tokio::test]
    async fn missing_env_without_infra_is_still_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::default();
        let mut reporter = reporter();

        let outcome = bootstrap(
            &options(dir.path()),
            &HashMap::<String, String>::new(),
            &runner,
            &mut reporter,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            Outcome::Skipped {
                infra_dir: dir.path().join("infra")
            }
        );
        assert!(runner.steps().is_empty());
        assert!(output(reporter).is_empty());
    }

    #[tokio::test]
    async fn environment_is_validated_once_infra_appears() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::default();
        let empty = HashMap::<String, String>::new();

        let outcome = bootstrap(&options(dir.path()), &empty, &runner, &mut reporter())
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Skipped { .. }));

        fs::create_dir(dir.path().join("infra")).unwrap();
        let err = bootstrap(&options(dir.path()), &empty, &runner, &mut reporter())
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Config(_)));
        assert_eq!(err.exit_code(), 2);
        assert!(runner.steps().is_empty());
    }

    #[tokio::test]
    async fn dry_run_prints_plan_and_runs_nothing() {
        let dir = with_infra();
        let runner = RecordingRunner::default();
        let mut opts = options(dir.path());
        opts.dry_run = true;
        let mut reporter = Reporter::new(Buffer::no_color(), Verbosity::Quiet);

        let outcome = bootstrap(&opts, &sample_env(), &runner, &mut reporter)
            .await
            .unwrap();

        match outcome {
            Outcome::Planned(commands) => assert_eq!(commands.len(), 3),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(runner.steps().is_empty());

        let out = output(reporter);
        assert!(out.contains("npm install --global aws-cdk@2.100.0"));
        assert!(out.contains("apiKey=****"));
        assert!(!out.contains("sk-live-abc123"));
    }

    #[tokio::test]
    async fn custom_infra_dir_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("deploy")).unwrap();
        let runner = RecordingRunner::default();
        let tools = ToolSettings {
            infra_dir: "deploy".to_string(),
            ..ToolSettings::default()
        };

        let outcome = bootstrap(
            &RunOptions::new(dir.path(), tools),
            &sample_env(),
            &runner,
            &mut reporter(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(runner.calls.lock().unwrap()[0].cwd, dir.path().join("deploy"));
    }

    #[tokio::test]
    async fn repeated_runs_have_the_same_outcome() {
        let dir = with_infra();
        let env = sample_env();

        for _ in 0..2 {
            let runner = RecordingRunner::default();
            let outcome = bootstrap(&options(dir.path()), &env, &runner, &mut reporter())
                .await
                .unwrap();
            assert_eq!(outcome, Outcome::Completed);
            assert_eq!(runner.steps(), Step::ALL);
        }
    }
}
