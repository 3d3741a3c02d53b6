use anyhow::Result;
use iqtest_domain::{AppHooks, Bench};

/// Supplies installed apps and the hooks each one declares.
pub trait HookSource {
    /// Installed apps in enumeration order.
    fn installed_apps(&self) -> Result<Vec<String>>;

    /// Hooks declared by `app`; `Ok(None)` when it declares none.
    fn app_hooks(&self, app: &str) -> Result<Option<AppHooks>>;
}

/// Reads `sites/apps.txt` and each app's `pyproject.toml`.
#[derive(Clone, Debug)]
pub struct BenchHookSource<'a> {
    bench: &'a Bench,
}

impl<'a> BenchHookSource<'a> {
    pub fn new(bench: &'a Bench) -> Self {
        Self { bench }
    }
}

impl HookSource for BenchHookSource<'_> {
    fn installed_apps(&self) -> Result<Vec<String>> {
        self.bench.installed_apps()
    }

    fn app_hooks(&self, app: &str) -> Result<Option<AppHooks>> {
        self.bench.load_app_hooks(app)
    }
}
