//! Discovery and filtering of declared test steps into an ordered worklist.
//!
//! Filter semantics:
//!
//! * `app` and `section` keep only exact name matches.
//! * `module` only constrains module steps and `doctype` only constrains
//!   record-type steps; a step of the other kind passes untouched.
//! * `test` narrows an explicit test list to that single name and drops the
//!   step when the list does not contain it. A module step without an explicit
//!   list keeps running the whole module even when `test` is set.

use anyhow::Result;
use iqtest_domain::{Step, TestGroup};
use serde::Serialize;
use tracing::{debug, warn};

use crate::source::HookSource;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filters {
    pub app: Option<String>,
    pub module: Option<String>,
    pub doctype: Option<String>,
    pub test: Option<String>,
    pub section: Option<String>,
}

impl Filters {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn keeps_app(&self, app: &str) -> bool {
        self.app.as_deref().is_none_or(|wanted| wanted == app)
    }

    fn keeps_section(&self, section: &str) -> bool {
        self.section.as_deref().is_none_or(|wanted| wanted == section)
    }

    /// Applies the step-level filters, returning the step to execute.
    #[must_use]
    pub fn apply(&self, step: &Step) -> Option<Step> {
        match step {
            Step::RecordType { doctype } => {
                if self.doctype.as_deref().is_some_and(|wanted| wanted != doctype) {
                    return None;
                }
                Some(step.clone())
            }
            Step::Module { module, tests } => {
                if self.module.as_deref().is_some_and(|wanted| wanted != module) {
                    return None;
                }
                match (tests, self.test.as_deref()) {
                    (Some(tests), Some(wanted)) => {
                        if tests.iter().any(|test| test == wanted) {
                            Some(Step::module_with_tests(module.clone(), [wanted]))
                        } else {
                            None
                        }
                    }
                    _ => Some(step.clone()),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionPlan {
    pub name: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppPlan {
    pub app: String,
    pub sections: Vec<SectionPlan>,
}

/// Filtered steps grouped by app and section, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Worklist {
    pub apps: Vec<AppPlan>,
    /// Steps declared across all apps before any filter applied.
    pub declared_steps: usize,
}

impl Worklist {
    /// Collects the test groups of every installed app and filters them.
    ///
    /// Apps whose hooks cannot be loaded are skipped with a warning.
    pub fn discover(source: &dyn HookSource, filters: &Filters) -> Result<Self> {
        let installed = source.installed_apps()?;
        if let Some(wanted) = filters.app.as_deref() {
            if !installed.iter().any(|app| app == wanted) {
                warn!(app = wanted, "app filter does not match any installed app");
            }
        }

        let mut groups = Vec::new();
        for app in &installed {
            match source.app_hooks(app) {
                Ok(Some(hooks)) => {
                    if let Some(group) = hooks.tests {
                        groups.push(group);
                    } else {
                        debug!(app = %app, "app declares no test groups");
                    }
                }
                Ok(None) => debug!(app = %app, "app declares no hooks"),
                Err(err) => warn!(app = %app, error = %format!("{err:#}"), "skipping app with unreadable hooks"),
            }
        }
        Ok(Self::from_groups(groups, filters))
    }

    /// Filters already-loaded groups; group order is traversal order.
    #[must_use]
    pub fn from_groups(groups: impl IntoIterator<Item = TestGroup>, filters: &Filters) -> Self {
        let mut declared_steps = 0;
        let mut apps = Vec::new();
        for group in groups {
            declared_steps += group.step_count();
            if !filters.keeps_app(&group.app) {
                continue;
            }
            let sections: Vec<SectionPlan> = group
                .sections
                .iter()
                .filter(|section| filters.keeps_section(&section.name))
                .map(|section| SectionPlan {
                    name: section.name.clone(),
                    steps: section.steps.iter().filter_map(|step| filters.apply(step)).collect(),
                })
                .filter(|section| !section.steps.is_empty())
                .collect();
            if sections.is_empty() {
                debug!(app = %group.app, "no steps left after filtering");
                continue;
            }
            apps.push(AppPlan {
                app: group.app,
                sections,
            });
        }
        Self {
            apps,
            declared_steps,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.apps
            .iter()
            .flat_map(|app| &app.sections)
            .map(|section| section.steps.len())
            .sum()
    }

    /// Flat `(app, section, step)` view in traversal order.
    pub fn steps(&self) -> impl Iterator<Item = (&str, &str, &Step)> {
        self.apps.iter().flat_map(|app| {
            app.sections.iter().flat_map(move |section| {
                section
                    .steps
                    .iter()
                    .map(move |step| (app.app.as_str(), section.name.as_str(), step))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use iqtest_domain::{AppHooks, Section};
    use std::collections::HashMap;

    fn sample_groups() -> Vec<TestGroup> {
        vec![
            TestGroup::new(
                "a",
                vec![Section::new(
                    "S1",
                    vec![Step::module_with_tests("m1", ["t1", "t2"])],
                )],
            ),
            TestGroup::new("b", vec![Section::new("S2", vec![Step::record_type("r1")])]),
        ]
    }

    fn triples(worklist: &Worklist) -> Vec<(String, String, Step)> {
        worklist
            .steps()
            .map(|(app, section, step)| (app.to_string(), section.to_string(), step.clone()))
            .collect()
    }

    #[test]
    fn unfiltered_worklist_keeps_declaration_order() {
        let worklist = Worklist::from_groups(sample_groups(), &Filters::default());
        assert_eq!(worklist.declared_steps, 2);
        assert_eq!(worklist.step_count(), 2);
        assert_eq!(
            triples(&worklist),
            vec![
                ("a".into(), "S1".into(), Step::module_with_tests("m1", ["t1", "t2"])),
                ("b".into(), "S2".into(), Step::record_type("r1")),
            ]
        );
    }

    #[test]
    fn app_filter_keeps_only_that_app() {
        let filters = Filters {
            app: Some("a".into()),
            ..Filters::default()
        };
        let worklist = Worklist::from_groups(sample_groups(), &filters);
        assert_eq!(
            triples(&worklist),
            vec![("a".into(), "S1".into(), Step::module_with_tests("m1", ["t1", "t2"]))]
        );
        assert_eq!(worklist.declared_steps, 2);
    }

    #[test]
    fn test_filter_narrows_explicit_lists_only() {
        let filters = Filters {
            test: Some("t2".into()),
            ..Filters::default()
        };
        let worklist = Worklist::from_groups(sample_groups(), &filters);
        assert_eq!(
            triples(&worklist),
            vec![
                ("a".into(), "S1".into(), Step::module_with_tests("m1", ["t2"])),
                ("b".into(), "S2".into(), Step::record_type("r1")),
            ]
        );
    }

    #[test]
    fn test_filter_drops_explicit_lists_without_a_match() {
        let filters = Filters {
            test: Some("t9".into()),
            ..Filters::default()
        };
        assert_eq!(filters.apply(&Step::module_with_tests("m1", ["t1"])), None);
    }

    #[test]
    fn test_filter_keeps_whole_module_steps() {
        let filters = Filters {
            test: Some("t9".into()),
            ..Filters::default()
        };
        assert_eq!(filters.apply(&Step::module("m1")), Some(Step::module("m1")));
    }

    #[test]
    fn module_and_doctype_filters_target_their_own_kind() {
        let module_only = Filters {
            module: Some("m2".into()),
            ..Filters::default()
        };
        assert_eq!(module_only.apply(&Step::module("m1")), None);
        assert_eq!(module_only.apply(&Step::module("m2")), Some(Step::module("m2")));
        assert_eq!(
            module_only.apply(&Step::record_type("r1")),
            Some(Step::record_type("r1"))
        );

        let doctype_only = Filters {
            doctype: Some("r2".into()),
            ..Filters::default()
        };
        assert_eq!(doctype_only.apply(&Step::record_type("r1")), None);
        assert_eq!(
            doctype_only.apply(&Step::module("m1")),
            Some(Step::module("m1"))
        );
    }

    #[test]
    fn section_filter_and_empty_pruning() {
        let groups = vec![TestGroup::new(
            "a",
            vec![
                Section::new("S1", vec![Step::module("m1")]),
                Section::new("S2", vec![Step::module("m2"), Step::record_type("r1")]),
            ],
        )];
        let filters = Filters {
            section: Some("S2".into()),
            ..Filters::default()
        };
        let worklist = Worklist::from_groups(groups.clone(), &filters);
        assert_eq!(worklist.apps.len(), 1);
        assert_eq!(worklist.apps[0].sections.len(), 1);
        assert_eq!(worklist.apps[0].sections[0].name, "S2");
        assert_eq!(worklist.step_count(), 2);

        let nothing = Filters {
            section: Some("S3".into()),
            ..Filters::default()
        };
        let worklist = Worklist::from_groups(groups, &nothing);
        assert!(worklist.is_empty());
        assert_eq!(worklist.declared_steps, 3);
    }

    struct FakeSource {
        apps: Vec<String>,
        hooks: HashMap<String, Result<Option<AppHooks>, String>>,
    }

    impl HookSource for FakeSource {
        fn installed_apps(&self) -> Result<Vec<String>> {
            Ok(self.apps.clone())
        }

        fn app_hooks(&self, app: &str) -> Result<Option<AppHooks>> {
            match self.hooks.get(app) {
                Some(Ok(hooks)) => Ok(hooks.clone()),
                Some(Err(message)) => Err(anyhow!(message.clone())),
                None => Ok(None),
            }
        }
    }

    #[test]
    fn discover_follows_installed_order_and_skips_broken_apps() {
        let groups = sample_groups();
        let source = FakeSource {
            apps: vec!["frappe".into(), "b".into(), "broken".into(), "a".into()],
            hooks: HashMap::from([
                (
                    "b".to_string(),
                    Ok(Some(AppHooks {
                        tests: Some(groups[1].clone()),
                        cleanup: Vec::new(),
                    })),
                ),
                ("broken".to_string(), Err("bad toml".to_string())),
                (
                    "a".to_string(),
                    Ok(Some(AppHooks {
                        tests: Some(groups[0].clone()),
                        cleanup: Vec::new(),
                    })),
                ),
            ]),
        };
        let worklist = Worklist::discover(&source, &Filters::default()).unwrap();
        let apps: Vec<&str> = worklist.apps.iter().map(|app| app.app.as_str()).collect();
        assert_eq!(apps, vec!["b", "a"]);
    }
}
