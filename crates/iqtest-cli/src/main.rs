use atty::Stream;
use clap::Parser;
use color_eyre::Result;

mod cli;
mod dispatch;
mod style;

use cli::IqtestCli;
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = IqtestCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));
    let code = dispatch::dispatch_command(&cli, &style)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!(
        "iqtest={level},iqtest_cli={level},iqtest_core={level},iqtest_domain={level}"
    );
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
