//! Per-case settings in `.timeline/config.json`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use time::macros::format_description;
use time::UtcOffset;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Offset buckets are cut in, e.g. `"+02:00"` or `"UTC"`.
    pub display_offset: String,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            display_offset: "UTC".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl TimelineConfig {
    pub const KEYS: [&'static str; 2] = ["display_offset", "log_level"];

    /// Read the config. A missing file gives the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write through a temp file in the same directory, renamed into place.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("config path {} has no parent", path.display()))?;
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.persist(path)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "display_offset" => Some(self.display_offset.as_str()),
            "log_level" => Some(self.log_level.as_str()),
            _ => None,
        }
    }

    /// Set a known key. Offsets are validated before they are stored.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "display_offset" => {
                parse_offset(value)?;
                self.display_offset = value.to_string();
            }
            "log_level" => self.log_level = value.to_string(),
            _ => anyhow::bail!(
                "unknown config key {key:?} (expected one of: {})",
                Self::KEYS.join(", ")
            ),
        }
        Ok(())
    }

    pub fn entries(&self) -> BTreeMap<&'static str, &str> {
        Self::KEYS
            .into_iter()
            .filter_map(|k| self.get(k).map(|v| (k, v)))
            .collect()
    }

    pub fn offset(&self) -> anyhow::Result<UtcOffset> {
        parse_offset(&self.display_offset)
    }
}

/// Parse `"UTC"`, `"Z"` or a signed `"+HH:MM"` offset.
pub fn parse_offset(s: &str) -> anyhow::Result<UtcOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s == "Z" {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(s, format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
        .map_err(|e| anyhow::anyhow!("invalid display offset {s:?}: {e}"))
}
