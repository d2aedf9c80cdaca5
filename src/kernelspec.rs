//! Kernelspec installation, so Jupyter frontends can launch the kernel.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::types::{Error, Result};

pub const DEFAULT_NAME: &str = "mcore";
const SPEC_FILE: &str = "kernel.json";

/// Contents of `kernel.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub argv: Vec<String>,
    pub display_name: String,
    pub language: String,
    pub interrupt_mode: String,
}

impl KernelSpec {
    /// Spec that starts `executable` with the connection file Jupyter provides.
    pub fn mcore(executable: &Path) -> Self {
        Self {
            argv: vec![
                executable.display().to_string(),
                "run".to_string(),
                "-f".to_string(),
                "{connection_file}".to_string(),
            ],
            display_name: "MCore".to_string(),
            language: "MCore".to_string(),
            interrupt_mode: "message".to_string(),
        }
    }
}

/// Jupyter data directory: `<prefix>/share/jupyter` when a prefix is given,
/// otherwise the per-user directory.
pub fn data_dir(prefix: Option<&Path>) -> Result<PathBuf> {
    match prefix {
        Some(prefix) => Ok(prefix.join("share").join("jupyter")),
        None => user_data_dir(
            std::env::var_os("JUPYTER_DATA_DIR"),
            std::env::var_os("XDG_DATA_HOME"),
            std::env::var_os("HOME"),
        )
        .ok_or_else(|| Error::not_found("cannot locate a Jupyter data directory, set JUPYTER_DATA_DIR")),
    }
}

fn user_data_dir(
    jupyter_data_dir: Option<OsString>,
    xdg_data_home: Option<OsString>,
    home: Option<OsString>,
) -> Option<PathBuf> {
    let non_empty = |v: Option<OsString>| v.filter(|v| !v.is_empty()).map(PathBuf::from);
    non_empty(jupyter_data_dir)
        .or_else(|| non_empty(xdg_data_home).map(|p| p.join("jupyter")))
        .or_else(|| non_empty(home).map(|p| p.join(".local").join("share").join("jupyter")))
}

/// Write `<data_dir>/kernels/<name>/kernel.json`, replacing any previous
/// spec of the same name. Returns the kernel directory.
pub fn install(spec: &KernelSpec, data_dir: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(Error::validation(format!("invalid kernel name: {:?}", name)));
    }
    let dir = data_dir.join("kernels").join(name);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(SPEC_FILE), serde_json::to_string_pretty(spec)?)?;
    tracing::info!(path = %dir.display(), "installed kernelspec");
    Ok(dir)
}
