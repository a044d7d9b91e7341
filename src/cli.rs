use std::path::PathBuf;

use cdk_bootstrap::bootstrap::diagnostics::Verbosity;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "cdk-bootstrap",
    version,
    about = "Install the pinned AWS CDK CLI and synthesize the infra project",
    after_help = "Reads CDK_VERSION, APPLICATION_NAME, AWS_ACCOUNT_ID, AWS_REGION, API_KEY \
                  and APPLICATION_TAG from the environment once the infra directory is \
                  found. Does nothing, and needs no variables, if it is absent."
)]
pub struct Args {
    /// Directory that contains the infra project
    #[arg(long, short = 'C', default_value = ".")]
    pub dir: PathBuf,

    /// TOML file with tool settings (npm/cdk paths, infra dir name, timeout)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Diagnostic output format (overrides the config file)
    #[arg(long, value_enum)]
    pub verbosity: Option<Verbosity>,

    /// Print the commands without running them
    #[arg(long)]
    pub dry_run: bool,
}
