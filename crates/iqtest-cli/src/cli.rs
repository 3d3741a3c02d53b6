use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

pub const IQTEST_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const IQTEST_BEFORE_HELP: &str = concat!(
    "iqtest ",
    env!("CARGO_PKG_VERSION"),
    " – Test-suite orchestrator for bench apps\n\n",
    "\x1b[1;36mCommands\x1b[0m\n",
    "  run              Run the test steps declared by installed apps.\n",
    "  plan             Show which steps would run, and how, without running them.\n",
    "  release-cleanup  Run the release-cleanup tasks declared by installed apps.\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = IQTEST_BEFORE_HELP,
    help_template = IQTEST_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct IqtestCli {
    #[arg(
        short,
        long,
        help = "Suppress the closing verdict line (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Print a JSON document instead of the text report",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[arg(
        long,
        value_name = "DIR",
        help = "Bench root (defaults to IQTEST_BENCH_ROOT or the nearest directory with sites/apps.txt)",
        global = true
    )]
    pub bench: Option<PathBuf>,
    #[arg(
        long,
        value_name = "SITE",
        help = "Site to test against (defaults to IQTEST_SITE or sites/currentsite.txt)",
        global = true
    )]
    pub site: Option<String>,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Run declared test steps app by app, section by section.",
        override_usage = "iqtest run [--app APP] [--module MODULE] [--doctype DOCTYPE] [--test TEST] [--section SECTION]"
    )]
    Run(RunArgs),
    #[command(about = "Print the filtered worklist and the commands it would run.")]
    Plan(FilterArgs),
    #[command(
        name = "release-cleanup",
        about = "Run release-cleanup tasks declared by installed apps."
    )]
    ReleaseCleanup,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long, value_name = "APP", help = "Only run this app")]
    pub app: Option<String>,
    #[arg(long, value_name = "MODULE", help = "Only run module steps for this module")]
    pub module: Option<String>,
    #[arg(long, value_name = "DOCTYPE", help = "Only run record-type steps for this doctype")]
    pub doctype: Option<String>,
    #[arg(
        long,
        value_name = "TEST",
        help = "Narrow explicit test lists to this test"
    )]
    pub test: Option<String>,
    #[arg(long, value_name = "SECTION", help = "Only run this section")]
    pub section: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub filters: FilterArgs,
    #[arg(
        long,
        help = "Stop at the first failing step (default)",
        conflicts_with = "continue_on_error"
    )]
    pub skip_on_first_error: bool,
    #[arg(
        long,
        help = "Run every step even after failures",
        conflicts_with = "skip_on_first_error"
    )]
    pub continue_on_error: bool,
}
