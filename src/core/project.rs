//! Project root detection and on-disk layout

use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Directory under the repo root that holds Canopy's persisted state
const STATE_DIR: &str = ".canopy";

/// Database filename inside the state directory
const DB_FILE: &str = "index.db";

/// A detected project: the repo root plus the state layout under it
#[derive(Debug, Clone)]
pub struct Project {
    /// Absolute path to the repo root
    pub root: PathBuf,
    /// Name of the project (directory name)
    pub name: String,
}

impl Project {
    /// Detect the repo root by walking up from `start_path` to a `.git` entry.
    ///
    /// `.canopy` also counts as a marker so an already-indexed tree keeps
    /// resolving to the same root after `.git` is removed.
    pub fn detect(start_path: &Path) -> Result<Self> {
        let root = find_repo_root(start_path)?;
        Ok(Self::at(root))
    }

    /// Use an explicit directory as the project root (must exist).
    pub fn from_path(path: &Path) -> Result<Self> {
        let root = path.canonicalize().map_err(|_| Error::NotFound {
            what: format!("project path {}", path.display()),
        })?;
        if !root.is_dir() {
            return Err(Error::NotFound {
                what: format!("project directory {}", root.display()),
            });
        }
        Ok(Self::at(root))
    }

    fn at(root: PathBuf) -> Self {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Self { root, name }
    }

    /// Default database path: `<root>/.canopy/index.db`
    pub fn db_path(&self) -> PathBuf {
        self.root.join(STATE_DIR).join(DB_FILE)
    }

    /// State directory path: `<root>/.canopy`
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }
}

/// Walk upward from `start` looking for `.git` (or `.canopy`)
fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let start = if start.is_file() {
        start.parent().unwrap_or(start)
    } else {
        start
    };

    let mut current = start.canonicalize().map_err(|_| Error::NoProjectRoot)?;

    loop {
        if current.join(".git").exists() || current.join(STATE_DIR).exists() {
            return Ok(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    Err(Error::NoProjectRoot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_git_root() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();

        let nested = temp.path().join("src").join("deep").join("nested");
        std::fs::create_dir_all(&nested).unwrap();

        let project = Project::detect(&nested).unwrap();
        assert_eq!(project.root, temp.path().canonicalize().unwrap());
        assert!(project.db_path().ends_with(".canopy/index.db"));
    }

    #[test]
    fn test_detect_canopy_state_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".canopy")).unwrap();

        let project = Project::detect(temp.path()).unwrap();
        assert_eq!(project.root, temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_no_project_root() {
        let temp = TempDir::new().unwrap();
        assert!(Project::detect(temp.path()).is_err());
    }
}
