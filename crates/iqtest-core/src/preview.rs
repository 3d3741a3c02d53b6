use std::fmt::Write as _;

use iqtest_domain::Step;
use serde::Serialize;

use crate::command::BenchCommand;
use crate::plan::Worklist;

/// One planned step with the command that would run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub app: String,
    pub section: String,
    pub step: Step,
    pub descriptor: String,
    pub command: String,
}

#[must_use]
pub fn plan_entries(worklist: &Worklist, bench: &BenchCommand) -> Vec<PlanEntry> {
    worklist
        .steps()
        .map(|(app, section, step)| {
            let request = bench.request(app, step);
            PlanEntry {
                app: app.to_string(),
                section: section.to_string(),
                step: step.clone(),
                command: request.display(),
                descriptor: request.descriptor,
            }
        })
        .collect()
}

/// Indented app → section → step listing.
#[must_use]
pub fn render_plan(entries: &[PlanEntry]) -> String {
    let mut out = String::new();
    let mut current: Option<(&str, &str)> = None;
    for entry in entries {
        let app_changed = current.is_none_or(|(app, _)| app != entry.app);
        if app_changed {
            let _ = writeln!(out, "{}", entry.app);
        }
        if app_changed || current.is_some_and(|(_, section)| section != entry.section) {
            let _ = writeln!(out, "  {}", entry.section);
        }
        let _ = writeln!(out, "    {}", entry.descriptor);
        let _ = writeln!(out, "      $ {}", entry.command);
        current = Some((entry.app.as_str(), entry.section.as_str()));
    }
    out
}
