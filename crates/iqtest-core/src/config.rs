//! Environment-derived settings and bench/site resolution.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;
use iqtest_domain::{discover_bench_root, Bench, APPS_TXT, CURRENT_SITE_TXT};

const DEFAULT_BENCH_BIN: &str = "bench";
const DEFAULT_PYTHON: &str = "python3";

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    /// Value of `key`, treating blank values as unset.
    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) bench_bin: String,
    pub(crate) bench_root: Option<PathBuf>,
    pub(crate) site: Option<String>,
    pub(crate) python: String,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            bench_bin: snapshot
                .var("IQTEST_BENCH_BIN")
                .unwrap_or(DEFAULT_BENCH_BIN)
                .to_string(),
            bench_root: snapshot.var("IQTEST_BENCH_ROOT").map(PathBuf::from),
            site: snapshot.var("IQTEST_SITE").map(ToOwned::to_owned),
            python: snapshot
                .var("IQTEST_PYTHON")
                .unwrap_or(DEFAULT_PYTHON)
                .to_string(),
        }
    }

    /// Program invoked for every test step.
    #[must_use]
    pub fn bench_bin(&self) -> &str {
        &self.bench_bin
    }

    /// Interpreter used for `.py` release-cleanup scripts.
    #[must_use]
    pub fn python(&self) -> &str {
        &self.python
    }

    /// Resolves the bench: explicit flag, then `IQTEST_BENCH_ROOT`, then the
    /// nearest ancestor of `cwd` holding `sites/apps.txt`.
    pub fn resolve_bench(&self, flag: Option<&Path>, cwd: &Path) -> Result<Bench> {
        let explicit = flag.map(Path::to_path_buf).or_else(|| self.bench_root.clone());
        let root = match explicit {
            Some(root) => root,
            None => discover_bench_root(cwd).ok_or_else(|| ConfigError::BenchNotFound {
                start: cwd.to_path_buf(),
            })?,
        };
        Bench::open(&root)
    }

    /// Resolves the site: explicit flag, then `IQTEST_SITE`, then
    /// `sites/currentsite.txt`.
    pub fn resolve_site(&self, flag: Option<&str>, bench: &Bench) -> Result<String> {
        if let Some(site) = flag.map(str::trim).filter(|site| !site.is_empty()) {
            return Ok(site.to_string());
        }
        if let Some(site) = &self.site {
            return Ok(site.clone());
        }
        bench
            .current_site()?
            .ok_or_else(|| ConfigError::SiteNotSpecified.into())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(
        "no bench found: neither {} nor any parent contains {}",
        .start.display(),
        APPS_TXT
    )]
    BenchNotFound { start: PathBuf },
    #[error(
        "no site specified: pass --site, set IQTEST_SITE or write {}",
        CURRENT_SITE_TXT
    )]
    SiteNotSpecified,
}
