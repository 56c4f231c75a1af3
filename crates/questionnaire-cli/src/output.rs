use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::CliResult;

pub const OUTPUT_DIR_ENV: &str = "QUESTIONNAIRE_OUTPUT_DIR";
pub const ALLOWED_ROOTS_ENV: &str = "QUESTIONNAIRE_ALLOWED_ROOTS";

/// Directories the CLI may write exports and saved answers into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRoots {
    roots: Vec<PathBuf>,
}

impl WriteRoots {
    /// Roots from `QUESTIONNAIRE_ALLOWED_ROOTS`, or the current directory when unset.
    pub fn from_env() -> CliResult<Self> {
        Self::parse(env::var(ALLOWED_ROOTS_ENV).ok().as_deref())
    }

    /// Colon-separated root list; blank segments are skipped.
    pub fn parse(value: Option<&str>) -> CliResult<Self> {
        let mut roots = Vec::new();
        for segment in value.unwrap_or_default().split(':').map(str::trim) {
            if segment.is_empty() {
                continue;
            }
            roots.push(anchor(Path::new(segment))?);
        }
        if roots.is_empty() {
            roots.push(anchor(&env::current_dir()?)?);
        }
        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resolves `target` and fails unless it lies under one of the roots.
    pub fn check(&self, target: &Path) -> CliResult<PathBuf> {
        let resolved = anchor(target)?;
        if self.roots.iter().any(|root| resolved.starts_with(root)) {
            Ok(resolved)
        } else {
            Err(format!(
                "'{}' is outside the allowed write roots ({}); set {} to widen them",
                resolved.display(),
                self.describe(),
                ALLOWED_ROOTS_ENV
            )
            .into())
        }
    }

    /// Writes `bytes` to `path`, refusing to clobber an existing file unless `force` is set.
    pub fn write(&self, path: &Path, bytes: &[u8], force: bool) -> CliResult<PathBuf> {
        let resolved = self.check(path)?;
        if resolved.exists() && !force {
            return Err(format!(
                "{} already exists; rerun with --force to overwrite",
                path.display()
            )
            .into());
        }
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&resolved, bytes)?;
        info!(path = %resolved.display(), bytes = bytes.len(), "wrote file");
        Ok(resolved)
    }

    fn describe(&self) -> String {
        self.roots
            .iter()
            .map(|root| root.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Export directory: `--out`, then `QUESTIONNAIRE_OUTPUT_DIR`, then `.`.
pub fn output_dir(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let dir = out
        .or_else(|| env::var_os(OUTPUT_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    if dir.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    Ok(dir)
}

/// Absolute, symlink-free form of `path`; components that do not exist yet are
/// appended to the canonical form of the deepest existing ancestor.
fn anchor(path: &Path) -> CliResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut pending: Vec<OsString> = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                pending.push(name.to_os_string());
                existing = parent;
            }
            _ => return Err(format!("cannot resolve '{}'", path.display()).into()),
        }
    }

    let mut anchored = existing.canonicalize()?;
    for name in pending.into_iter().rev() {
        anchored.push(name);
    }
    debug!(path = %path.display(), resolved = %anchored.display(), "resolved write target");
    Ok(anchored)
}
