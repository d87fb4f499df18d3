use std::path::{Path, PathBuf};

/// Well-known paths under a case's `.timeline/` directory.
#[derive(Debug, Clone)]
pub struct TimelinePaths {
    pub root: PathBuf,
    pub timeline_dir: PathBuf,
    pub events_db: PathBuf,
    pub config_json: PathBuf,
    pub lock_file: PathBuf,
}

impl TimelinePaths {
    /// Derive all paths from a case directory. Pure computation, no I/O.
    pub fn discover(case_dir: impl Into<PathBuf>) -> Self {
        let root = case_dir.into();
        let timeline_dir = root.join(".timeline");
        Self {
            events_db: timeline_dir.join("events.db"),
            config_json: timeline_dir.join("config.json"),
            lock_file: timeline_dir.join("LOCK"),
            timeline_dir,
            root,
        }
    }

    /// Create `.timeline/`. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.timeline_dir)?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.timeline_dir.is_dir()
    }

    /// Walk up from `start` looking for a directory containing `.timeline/`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(".timeline").is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_builds_correct_paths() {
        let p = TimelinePaths::discover("/cases/c1");
        assert_eq!(p.timeline_dir, PathBuf::from("/cases/c1/.timeline"));
        assert_eq!(p.events_db, PathBuf::from("/cases/c1/.timeline/events.db"));
        assert_eq!(p.config_json, PathBuf::from("/cases/c1/.timeline/config.json"));
        assert_eq!(p.lock_file, PathBuf::from("/cases/c1/.timeline/LOCK"));
    }

    #[test]
    fn layout_and_root_discovery() {
        let tmp = tempfile::tempdir().unwrap();
        let p = TimelinePaths::discover(tmp.path());
        assert!(!p.is_initialized());
        p.ensure_layout().unwrap();
        assert!(p.is_initialized());

        let nested = tmp.path().join("exports").join("2024");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(TimelinePaths::find_root(&nested), Some(tmp.path().to_path_buf()));
    }
}
