#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod classify;
pub mod cleanup;
mod command;
mod config;
pub mod orchestrator;
pub mod plan;
mod preview;
pub mod process;
pub mod report;
mod runner;
mod source;

pub use crate::cleanup::{
    collect_cleanup_tasks, inside_image_build, CleanupEntry, CleanupOutcome, CleanupRecord,
    CleanupReport, ReleaseCleanup,
};
pub use crate::command::{BenchCommand, ExecutionRequest, SKIP_TEST_RECORDS};
pub use crate::config::{Config, ConfigError};
pub use crate::orchestrator::{ErrorPolicy, RunState, SuiteRunner};
pub use crate::plan::{AppPlan, Filters, SectionPlan, Worklist};
pub use crate::preview::{plan_entries, render_plan, PlanEntry};
pub use crate::process::RunOutput;
pub use crate::report::{render_summary, RunStatus, RunSummary, TestResult};
pub use crate::runner::{CommandRunner, HostCommandRunner};
pub use crate::source::{BenchHookSource, HookSource};
