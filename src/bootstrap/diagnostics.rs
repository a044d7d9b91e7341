//! Operator-facing progress output
//!
//! Everything here is best-effort: a failed write to stdout never fails the
//! run. Secret context values are always printed redacted.

use std::io::Write;

use clap::ValueEnum;
use serde::Deserialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use super::steps::CommandSpec;
use crate::config::SynthContext;

/// How much the runner prints to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// No diagnostic output
    Quiet,
    /// One `key: value` line per context entry
    #[default]
    Plain,
    /// Quoted values in a numbered list
    Numbered,
}

pub struct Reporter<W: WriteColor> {
    out: W,
    verbosity: Verbosity,
}

impl Reporter<StandardStream> {
    pub fn stdout(verbosity: Verbosity) -> Self {
        Self::new(StandardStream::stdout(ColorChoice::Auto), verbosity)
    }
}

impl<W: WriteColor> Reporter<W> {
    pub fn new(out: W, verbosity: Verbosity) -> Self {
        Self { out, verbosity }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn announce_version(&mut self, version: &str) {
        match self.verbosity {
            Verbosity::Quiet => {}
            Verbosity::Plain => {
                let _ = writeln!(self.out, "Installing CDK version {version}");
            }
            Verbosity::Numbered => {
                let _ = writeln!(self.out, "CDK version: \"{version}\"");
            }
        }
    }

    pub fn context(&mut self, context: &SynthContext) {
        match self.verbosity {
            Verbosity::Quiet => {}
            Verbosity::Plain => {
                for entry in context.entries() {
                    let _ = writeln!(self.out, "{}: {}", entry.key, entry.display_value());
                }
            }
            Verbosity::Numbered => {
                let _ = writeln!(self.out, "Synth context:");
                for (index, entry) in context.entries().iter().enumerate() {
                    let _ = writeln!(
                        self.out,
                        "  {}. {}=\"{}\"",
                        index + 1,
                        entry.key,
                        entry.display_value()
                    );
                }
            }
        }
    }

    pub fn step_started(&mut self, command: &CommandSpec) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        let _ = self
            .out
            .set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(self.out, "▶ {}: {command}", command.step);
        let _ = self.out.reset();
    }

    pub fn finished(&mut self) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        let _ = self
            .out
            .set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
        let _ = writeln!(self.out, "✅ Synth completed");
        let _ = self.out.reset();
    }

    /// Printed whatever the verbosity; listing the plan is the point of a dry run.
    pub fn dry_run(&mut self, commands: &[CommandSpec]) {
        let _ = self.out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(self.out, "Dry run, nothing will be executed:");
        let _ = self.out.reset();
        for (index, command) in commands.iter().enumerate() {
            let _ = writeln!(
                self.out,
                "  {}. [{}] {command}  (in {})",
                index + 1,
                command.step,
                command.cwd.display()
            );
        }
    }
}
