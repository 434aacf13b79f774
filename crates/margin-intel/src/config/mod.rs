use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};

pub const MART_PATH_ENV: &str = "MARGIN_INTEL_MART";

const DEFAULT_MART_DIR: &str = ".margin-intel";
const DEFAULT_MART_FILE: &str = "mart.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub home_dir: PathBuf,
    pub cwd: PathBuf,
    pub mart_path: PathBuf,
}

impl RuntimePaths {
    /// Where the mart lives when neither `--mart` nor the environment names one.
    #[must_use]
    pub fn default_mart_path(home_dir: &Path) -> PathBuf {
        home_dir.join(DEFAULT_MART_DIR).join(DEFAULT_MART_FILE)
    }
}

/// `mart_override` comes from `--mart` or, failing that, the environment.
/// An empty override counts as absent.
pub fn resolve_runtime_paths(
    home_dir: &Path,
    cwd: &Path,
    mart_override: Option<&Path>,
) -> Result<RuntimePaths> {
    let home_dir = absolute_root("home_dir", home_dir)?;
    let cwd = absolute_root("cwd", cwd)?;

    let mart_path = match mart_override.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => resolve_mart_override(path, &home_dir, &cwd)
            .with_context(|| format!("invalid mart path: {}", path.display()))?,
        None => RuntimePaths::default_mart_path(&home_dir),
    };

    Ok(RuntimePaths {
        home_dir,
        cwd,
        mart_path,
    })
}

fn absolute_root(label: &str, path: &Path) -> Result<PathBuf> {
    ensure!(path.is_absolute(), "{label} must be absolute: {}", path.display());
    Ok(lexically_normal(path))
}

/// `~` and `~/...` anchor at home, other relative paths at cwd.
fn resolve_mart_override(path: &Path, home_dir: &Path, cwd: &Path) -> Result<PathBuf> {
    let anchored = if let Ok(rest) = path.strip_prefix("~") {
        home_dir.join(rest)
    } else if path
        .to_str()
        .is_some_and(|text| text.starts_with('~'))
    {
        bail!("only `~` and `~/...` home expansion is supported");
    } else {
        cwd.join(path)
    };

    let mart_path = lexically_normal(&anchored);
    ensure!(
        mart_path.file_name().is_some(),
        "mart path must name a database file"
    );
    Ok(mart_path)
}

fn lexically_normal(path: &Path) -> PathBuf {
    path.components()
        .fold(PathBuf::new(), |mut normal, component| {
            match component {
                Component::CurDir => {}
                Component::ParentDir if normal.file_name().is_some() => {
                    normal.pop();
                }
                Component::ParentDir if normal.has_root() => {}
                other => normal.push(other.as_os_str()),
            }
            normal
        })
}
