use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DB_FILE_NAME: &str = "nutrition.db";

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Pick the database location once at startup. An explicit path (from
    /// `--db` or `NUTRILOG_DB`) is used as-is; otherwise the default
    /// candidates are probed in order and the first writable one wins.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        let db_path = match explicit {
            Some(path) => {
                probe_writable(&path).with_context(|| {
                    format!("Database location is not writable: {}", path.display())
                })?;
                path
            }
            None => first_writable(&default_candidates())?,
        };
        info!(path = %db_path.display(), "using database location");
        Ok(Config { db_path })
    }
}

pub fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![
        Path::new("/data").join(DB_FILE_NAME),
        Path::new("/tmp").join(DB_FILE_NAME),
        Path::new(".").join(DB_FILE_NAME),
    ];
    if let Some(proj_dirs) = ProjectDirs::from("", "", "nutrilog") {
        candidates.push(proj_dirs.data_dir().join(DB_FILE_NAME));
    }
    candidates
}

pub fn first_writable(candidates: &[PathBuf]) -> Result<PathBuf> {
    for candidate in candidates {
        match probe_writable(candidate) {
            Ok(()) => return Ok(candidate.clone()),
            Err(e) => {
                warn!(path = %candidate.display(), error = %format!("{e:#}"), "cannot write to database location");
            }
        }
    }
    let tried = candidates
        .iter()
        .map(|c| c.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    bail!("No writable location found for database (tried: {tried})")
}

/// Create the parent directory and prove a file can be written next to the database.
fn probe_writable(db_path: &Path) -> Result<()> {
    let dir = match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let probe = dir.join(".write_test");
    std::fs::write(&probe, b"")
        .with_context(|| format!("Failed to write to {}", dir.display()))?;
    std::fs::remove_file(&probe)
        .with_context(|| format!("Failed to remove {}", probe.display()))?;
    Ok(())
}
