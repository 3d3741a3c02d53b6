use std::env;
use std::io;

use color_eyre::{eyre::eyre, Result};
use iqtest_core::{
    collect_cleanup_tasks, inside_image_build, plan_entries, render_plan, render_summary,
    BenchCommand, BenchHookSource, Config, ErrorPolicy, Filters, HostCommandRunner, PlanEntry,
    ReleaseCleanup, SuiteRunner, Worklist,
};
use iqtest_domain::Bench;
use serde::Serialize;
use tracing::debug;

use crate::cli::{CommandGroupCli, FilterArgs, IqtestCli, RunArgs};
use crate::style::Style;

/// Runs the selected command and returns the process exit code.
pub fn dispatch_command(cli: &IqtestCli, style: &Style) -> Result<i32> {
    let config = Config::from_env();
    match &cli.command {
        CommandGroupCli::Run(args) => run_tests(cli, &config, args, style),
        CommandGroupCli::Plan(filters) => plan_tests(cli, &config, filters, style),
        CommandGroupCli::ReleaseCleanup => release_cleanup(cli, &config, style),
    }
}

fn core_err(err: anyhow::Error) -> color_eyre::Report {
    eyre!("{err:#}")
}

fn open_bench(cli: &IqtestCli, config: &Config) -> Result<Bench> {
    let cwd = env::current_dir()?;
    let bench = config
        .resolve_bench(cli.bench.as_deref(), &cwd)
        .map_err(core_err)?;
    debug!(root = %bench.root().display(), "resolved bench");
    Ok(bench)
}

fn bench_command(cli: &IqtestCli, config: &Config, bench: &Bench) -> Result<BenchCommand> {
    let site = config
        .resolve_site(cli.site.as_deref(), bench)
        .map_err(core_err)?;
    debug!(site = %site, program = config.bench_bin(), "resolved site");
    Ok(BenchCommand::new(config.bench_bin(), site, bench.root()))
}

fn filters_from_args(args: &FilterArgs) -> Filters {
    Filters {
        app: args.app.clone(),
        module: args.module.clone(),
        doctype: args.doctype.clone(),
        test: args.test.clone(),
        section: args.section.clone(),
    }
}

fn run_tests(cli: &IqtestCli, config: &Config, args: &RunArgs, style: &Style) -> Result<i32> {
    let bench = open_bench(cli, config)?;
    let command = bench_command(cli, config, &bench)?;
    let filters = filters_from_args(&args.filters);
    let worklist =
        Worklist::discover(&BenchHookSource::new(&bench), &filters).map_err(core_err)?;
    let policy = if args.continue_on_error {
        ErrorPolicy::ContinueOnError
    } else {
        ErrorPolicy::StopOnFirstError
    };
    debug!(steps = worklist.step_count(), ?policy, "starting test run");

    let runner = HostCommandRunner;
    let suite = SuiteRunner::new(&runner, &command, policy);
    if cli.json {
        let summary = suite
            .capture_only()
            .run(&worklist, &mut io::sink())
            .map_err(core_err)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(summary.exit_code());
    }

    // Children echo through the same stdout, so it must not stay locked here.
    let summary = suite
        .run(&worklist, &mut io::stdout())
        .map_err(core_err)?;
    if summary.executed() > 0 {
        print!("{}", render_summary(&summary));
    }
    if !cli.quiet {
        println!("\n{}", style.verdict(summary.status, &summary.verdict()));
    }
    Ok(summary.exit_code())
}

#[derive(Serialize)]
struct PlanDocument<'a> {
    bench: String,
    site: &'a str,
    filters: &'a Filters,
    declared_steps: usize,
    steps: &'a [PlanEntry],
}

fn plan_tests(cli: &IqtestCli, config: &Config, args: &FilterArgs, style: &Style) -> Result<i32> {
    let bench = open_bench(cli, config)?;
    let command = bench_command(cli, config, &bench)?;
    let filters = filters_from_args(args);
    let worklist =
        Worklist::discover(&BenchHookSource::new(&bench), &filters).map_err(core_err)?;
    let entries = plan_entries(&worklist, &command);

    if cli.json {
        let document = PlanDocument {
            bench: bench.root().display().to_string(),
            site: command.site(),
            filters: &filters,
            declared_steps: worklist.declared_steps,
            steps: &entries,
        };
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(0);
    }

    if entries.is_empty() {
        let message = if worklist.declared_steps > 0 {
            "No steps match the given filters."
        } else {
            "No installed application declares tests."
        };
        println!("{}", style.info(message));
        return Ok(0);
    }
    print!("{}", render_plan(&entries));
    if !cli.quiet {
        println!(
            "\n{}",
            style.info(&format!(
                "{} of {} declared steps planned",
                entries.len(),
                worklist.declared_steps
            ))
        );
    }
    Ok(0)
}

fn release_cleanup(cli: &IqtestCli, config: &Config, style: &Style) -> Result<i32> {
    let bench = open_bench(cli, config)?;
    let entries = collect_cleanup_tasks(&BenchHookSource::new(&bench)).map_err(core_err)?;
    let app_dirs = bench
        .installed_apps()
        .map_err(core_err)?
        .iter()
        .map(|app| bench.app_dir(app))
        .collect();
    let in_build = inside_image_build();
    debug!(tasks = entries.len(), in_build, "starting release cleanup");

    let runner = HostCommandRunner;
    let cleanup = ReleaseCleanup::new(&runner, bench.root(), app_dirs, config.python(), in_build);
    if cli.json {
        let report = cleanup
            .capture_only()
            .run(&entries, &mut io::sink())
            .map_err(core_err)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.exit_code());
    }

    let report = cleanup
        .run(&entries, &mut io::stdout())
        .map_err(core_err)?;
    if !cli.quiet {
        let failed = report.failed();
        if entries.is_empty() {
            println!("{}", style.info("No release-cleanup tasks declared."));
        } else if failed == 0 {
            println!("\n{}", style.success("✔ Release cleanup finished"));
        } else {
            println!(
                "\n{}",
                style.failure(&format!("✖ {failed} release-cleanup task(s) failed"))
            );
        }
    }
    Ok(report.exit_code())
}
