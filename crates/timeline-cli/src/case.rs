use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use timeline_core::Filter;
use timeline_store::{EventStore, TimelineConfig, TimelinePaths};

/// An opened case: its paths, config and store.
pub struct Case {
    pub paths: TimelinePaths,
    pub config: TimelineConfig,
    pub store: EventStore,
}

impl Case {
    /// Open the store of an initialized case, with the configured display offset.
    pub fn open(repo_root: &Path) -> anyhow::Result<Self> {
        let paths = require_initialized(repo_root)?;
        let config = TimelineConfig::load(&paths.config_json)?;
        let store = EventStore::connect(&paths.events_db).ok_or_else(|| {
            anyhow::anyhow!("timeline unavailable: cannot open {}", paths.events_db.display())
        })?;
        store.set_display_offset(config.offset()?);
        Ok(Self {
            paths,
            config,
            store,
        })
    }
}

pub fn require_initialized(repo_root: &Path) -> anyhow::Result<TimelinePaths> {
    let paths = TimelinePaths::discover(repo_root);
    if !paths.is_initialized() {
        anyhow::bail!("No .timeline/ found. Run `timeline init` first.");
    }
    Ok(paths)
}

/// Parse an RFC 3339 timestamp or integer epoch seconds.
pub fn parse_time(s: &str) -> anyhow::Result<i64> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<i64>() {
        return Ok(secs);
    }
    OffsetDateTime::parse(s, &Rfc3339)
        .map(|dt| dt.unix_timestamp())
        .map_err(|e| anyhow::anyhow!("invalid time {s:?} (want RFC 3339 or epoch seconds): {e}"))
}

pub fn format_time(ts: i64) -> String {
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| ts.to_string())
}

/// Load a filter tree from a JSON file, or match everything.
pub fn load_filter(path: Option<&Path>) -> anyhow::Result<Filter> {
    match path {
        Some(p) => {
            let json = std::fs::read_to_string(p)
                .map_err(|e| anyhow::anyhow!("cannot read filter {}: {e}", p.display()))?;
            Ok(Filter::from_json(&json)?)
        }
        None => Ok(Filter::All),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_epoch_and_rfc3339() {
        assert_eq!(parse_time("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_time("-5").unwrap(), -5);
        assert_eq!(parse_time("1970-01-01T01:00:00Z").unwrap(), 3600);
        assert_eq!(parse_time("1970-01-01T01:00:00+01:00").unwrap(), 0);
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn formats_as_rfc3339() {
        assert_eq!(format_time(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn uninitialized_case_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Case::open(tmp.path()).is_err());
    }

    #[test]
    fn missing_filter_matches_all() {
        assert_eq!(load_filter(None).unwrap(), Filter::All);
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f.json");
        std::fs::write(&path, r#"{"text":{"text":"mail"}}"#).unwrap();
        assert_eq!(load_filter(Some(&path)).unwrap(), Filter::text("mail"));
    }
}
