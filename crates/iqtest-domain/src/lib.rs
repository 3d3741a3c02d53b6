#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod bench;
pub mod hooks;

pub use bench::{discover_bench_root, parse_apps_txt, Bench, APPS_TXT, CURRENT_SITE_TXT};
pub use hooks::{
    parse_app_hooks, AppHooks, CleanupAction, CleanupTask, Section, Step, TestGroup,
    UNNAMED_SECTION,
};
