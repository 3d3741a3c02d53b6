use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

use crate::hooks::{parse_app_hooks, AppHooks};

/// Installed apps of a bench, one per line.
pub const APPS_TXT: &str = "sites/apps.txt";
/// Default site of a bench.
pub const CURRENT_SITE_TXT: &str = "sites/currentsite.txt";

/// A bench directory: `apps/<app>/` checkouts plus a `sites/` directory.
#[derive(Clone, Debug)]
pub struct Bench {
    root: PathBuf,
}

impl Bench {
    /// Opens the bench rooted at `root`, which must contain `sites/apps.txt`.
    pub fn open(root: &Path) -> Result<Self> {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        if !root.join(APPS_TXT).is_file() {
            return Err(anyhow!(
                "{} not found in bench root {}",
                APPS_TXT,
                root.display()
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn app_dir(&self, app: &str) -> PathBuf {
        self.root.join("apps").join(app)
    }

    pub fn app_manifest_path(&self, app: &str) -> PathBuf {
        self.app_dir(app).join("pyproject.toml")
    }

    /// Installed apps in enumeration order.
    pub fn installed_apps(&self) -> Result<Vec<String>> {
        let path = self.root.join(APPS_TXT);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(parse_apps_txt(&contents))
    }

    /// Site named in `sites/currentsite.txt`, if any.
    pub fn current_site(&self) -> Result<Option<String>> {
        let path = self.root.join(CURRENT_SITE_TXT);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let site = contents.trim();
        Ok((!site.is_empty()).then(|| site.to_string()))
    }

    /// Loads the `[tool.iq]` hooks of `app`; `Ok(None)` when the app has no
    /// manifest or declares nothing.
    pub fn load_app_hooks(&self, app: &str) -> Result<Option<AppHooks>> {
        let path = self.app_manifest_path(app);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        parse_app_hooks(app, &contents)
    }
}

/// Walks upward from `start` to the nearest directory containing `sites/apps.txt`.
pub fn discover_bench_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(APPS_TXT).is_file() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

pub fn parse_apps_txt(contents: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert((*line).to_string()))
        .map(ToString::to_string)
        .collect()
}
