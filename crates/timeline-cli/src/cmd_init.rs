use std::path::Path;
use timeline_store::{EventStore, TimelineConfig, TimelinePaths};

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = TimelinePaths::discover(repo_root);
    let existed = paths.is_initialized();

    paths.ensure_layout()?;
    // Opening creates or migrates the schema.
    EventStore::open(&paths.events_db)?;
    if !paths.config_json.exists() {
        TimelineConfig::default().save(&paths.config_json)?;
    }

    if existed {
        println!("Already initialized at {}", paths.timeline_dir.display());
    } else {
        println!("Initialized timeline at {}", paths.timeline_dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_db_and_config_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        execute(tmp.path()).unwrap();
        let paths = TimelinePaths::discover(tmp.path());
        assert!(paths.events_db.is_file());
        assert!(paths.config_json.is_file());
        execute(tmp.path()).unwrap();
    }
}
