//! Test and release-cleanup declarations contributed by installed apps.
//!
//! Each app declares its hooks in `pyproject.toml` under `[tool.iq]`:
//!
//! ```toml
//! [[tool.iq.tests]]
//! section = "Accounting"
//! steps = [
//!     { doctype = "Sales Invoice" },
//!     { module = "acme.accounts.test_tax", tests = ["test_vat"] },
//! ]
//!
//! [[tool.iq.release-cleanup]]
//! bash = "find . -name '*.pyc' -delete"
//! ```
//!
//! Declarations belong to foreign apps, so malformed entries are skipped with
//! a warning instead of failing the whole bench.

use anyhow::{Context, Result};
use serde::Serialize;
use toml_edit::{DocumentMut, Item, TableLike};
use tracing::{debug, warn};

pub const UNNAMED_SECTION: &str = "Unnamed section";

const ONLY_DURING_BUILD: &str = "only_during_build";

/// A single executable test unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Runs the tests of one record type (a Frappe doctype).
    RecordType { doctype: String },
    /// Runs a test module; `tests` restricts execution to the named tests and
    /// is never an empty list.
    Module {
        module: String,
        tests: Option<Vec<String>>,
    },
}

impl Step {
    pub fn record_type(doctype: impl Into<String>) -> Self {
        Step::RecordType {
            doctype: doctype.into(),
        }
    }

    pub fn module(module: impl Into<String>) -> Self {
        Step::Module {
            module: module.into(),
            tests: None,
        }
    }

    /// Module step restricted to `tests`; an empty list means all tests.
    pub fn module_with_tests<I, S>(module: impl Into<String>, tests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tests: Vec<String> = tests.into_iter().map(Into::into).collect();
        Step::Module {
            module: module.into(),
            tests: if tests.is_empty() { None } else { Some(tests) },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Section {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

/// Ordered test sections declared by one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestGroup {
    pub app: String,
    pub sections: Vec<Section>,
}

impl TestGroup {
    pub fn new(app: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            app: app.into(),
            sections,
        }
    }

    pub fn step_count(&self) -> usize {
        self.sections.iter().map(|section| section.steps.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CleanupAction {
    /// Shell command line.
    Bash(String),
    /// Path relative to an app directory.
    Script(String),
    /// Dotted path of a host-interpreter callable.
    Function(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupTask {
    pub action: CleanupAction,
    pub only_during_build: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppHooks {
    pub tests: Option<TestGroup>,
    pub cleanup: Vec<CleanupTask>,
}

/// Parses the `[tool.iq]` hooks of `app` from its `pyproject.toml` contents.
///
/// Returns `Ok(None)` when the manifest declares no `[tool.iq]` table.
pub fn parse_app_hooks(app: &str, contents: &str) -> Result<Option<AppHooks>> {
    let doc: DocumentMut = contents
        .parse()
        .with_context(|| format!("failed to parse pyproject.toml of app {app}"))?;
    let Some(iq) = doc
        .get("tool")
        .and_then(Item::as_table_like)
        .and_then(|tool| tool.get("iq"))
        .and_then(Item::as_table_like)
    else {
        return Ok(None);
    };

    let tests = iq
        .get("tests")
        .map(|item| parse_test_group(app, item))
        .and_then(|group| (!group.sections.is_empty()).then_some(group));
    let cleanup = iq
        .get("release-cleanup")
        .map(|item| parse_cleanup_tasks(app, item))
        .unwrap_or_default();

    Ok(Some(AppHooks { tests, cleanup }))
}

fn parse_test_group(app: &str, item: &Item) -> TestGroup {
    let sections = table_entries(app, "tool.iq.tests", item)
        .into_iter()
        .enumerate()
        .map(|(index, table)| parse_section(app, index, table))
        .collect();
    TestGroup::new(app, sections)
}

fn parse_section(app: &str, index: usize, table: &dyn TableLike) -> Section {
    let name = table
        .get("section")
        .and_then(Item::as_str)
        .unwrap_or(UNNAMED_SECTION)
        .to_string();
    let steps = match table.get("steps") {
        Some(item) => table_entries(app, "steps", item)
            .into_iter()
            .enumerate()
            .filter_map(|(step_index, step)| parse_step(app, &name, step_index, step))
            .collect(),
        None => {
            debug!(app, section = %name, index, "section declares no steps");
            Vec::new()
        }
    };
    Section { name, steps }
}

fn parse_step(app: &str, section: &str, index: usize, table: &dyn TableLike) -> Option<Step> {
    let doctype = non_empty_str(table.get("doctype"));
    let module = non_empty_str(table.get("module"));
    match (doctype, module) {
        (Some(doctype), None) => Some(Step::record_type(doctype)),
        (None, Some(module)) => {
            let Some(item) = table.get("tests") else {
                return Some(Step::module(module));
            };
            let Some(tests) = string_list(item) else {
                warn!(
                    app,
                    section,
                    index,
                    module,
                    "skipping step: `tests` must be an array of strings"
                );
                return None;
            };
            if tests.is_empty() {
                debug!(app, section, module, "empty test list runs the whole module");
            }
            Some(Step::module_with_tests(module, tests))
        }
        (Some(_), Some(_)) => {
            warn!(
                app,
                section,
                index,
                "skipping step: declares both `doctype` and `module`"
            );
            None
        }
        (None, None) => {
            warn!(
                app,
                section,
                index,
                "skipping step: declares neither `doctype` nor `module`"
            );
            None
        }
    }
}

fn parse_cleanup_tasks(app: &str, item: &Item) -> Vec<CleanupTask> {
    table_entries(app, "tool.iq.release-cleanup", item)
        .into_iter()
        .enumerate()
        .filter_map(|(index, table)| {
            let action = if let Some(function) = non_empty_str(table.get("function")) {
                CleanupAction::Function(function.to_string())
            } else if let Some(bash) = non_empty_str(table.get("bash")) {
                CleanupAction::Bash(bash.to_string())
            } else if let Some(script) = non_empty_str(table.get("script")) {
                CleanupAction::Script(script.to_string())
            } else {
                warn!(
                    app,
                    index, "skipping cleanup task without `function`, `bash` or `script`"
                );
                return None;
            };
            let only_during_build = table.get("context").and_then(Item::as_str)
                == Some(ONLY_DURING_BUILD);
            Some(CleanupTask {
                action,
                only_during_build,
            })
        })
        .collect()
}

/// Accepts both `[[x]]` arrays of tables and inline `x = [{ ... }]` arrays.
fn table_entries<'a>(app: &str, key: &str, item: &'a Item) -> Vec<&'a dyn TableLike> {
    if let Some(tables) = item.as_array_of_tables() {
        return tables.iter().map(|table| table as &dyn TableLike).collect();
    }
    let Some(array) = item.as_array() else {
        warn!(app, key, "ignoring entry: expected an array of tables");
        return Vec::new();
    };
    array
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match value.as_inline_table() {
            Some(table) => Some(table as &dyn TableLike),
            None => {
                warn!(app, key, index, "ignoring non-table array entry");
                None
            }
        })
        .collect()
}

fn non_empty_str(item: Option<&Item>) -> Option<&str> {
    item.and_then(Item::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn string_list(item: &Item) -> Option<Vec<String>> {
    item.as_array()?
        .iter()
        .map(|value| value.as_str().map(ToString::to_string))
        .collect()
}
