use crate::case::Case;
use std::io::{BufRead, BufReader};
use std::path::Path;
use timeline_core::NewEvent;
use timeline_store::{CaseLock, EventStore};
use tracing::{info, warn};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub inserted: usize,
    pub failed: usize,
}

/// `timeline ingest <file|->`
pub fn execute(repo_root: &Path, source: &str) -> anyhow::Result<()> {
    let case = Case::open(repo_root)?;
    let _lock = CaseLock::acquire(&case.paths, "ingest")?;

    if case.store.was_ingest_running() {
        warn!("previous ingest did not finish; events may be incomplete");
    }
    let summary = if source == "-" {
        ingest(&case.store, std::io::stdin().lock())?
    } else {
        let file = std::fs::File::open(source)
            .map_err(|e| anyhow::anyhow!("cannot open {source}: {e}"))?;
        ingest(&case.store, BufReader::new(file))?
    };

    println!("Ingested {} events.", summary.inserted);
    if summary.failed > 0 {
        println!("{} events could not be stored (see log).", summary.failed);
    }
    Ok(())
}

/// Parse every line first so a malformed feed leaves the store untouched,
/// then insert in one transaction.
pub fn ingest(store: &EventStore, reader: impl BufRead) -> anyhow::Result<IngestSummary> {
    let mut events = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: NewEvent = serde_json::from_str(&line)
            .map_err(|e| anyhow::anyhow!("line {}: {e}", n + 1))?;
        events.push(event);
    }

    store.record_was_ingest_running(true);
    let mut summary = IngestSummary::default();
    let mut tx = store.begin_transaction();
    for event in &events {
        match tx.insert_event(event) {
            Some(_) => summary.inserted += 1,
            None => summary.failed += 1,
        }
    }
    tx.commit(true);
    drop(tx);

    if let Some(max_file) = events.iter().map(|e| e.file_id).max() {
        store.record_last_object_id(max_file.max(store.last_object_id()));
    }
    if let Some(max_artifact) = events.iter().filter_map(|e| e.artifact_id).max() {
        store.record_last_artifact_id(max_artifact.max(store.last_artifact_id()));
    }
    store.record_was_ingest_running(false);
    info!(inserted = summary.inserted, failed = summary.failed, "ingest finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FEED: &str = r#"
{"file_id":4,"time":100,"sub_type":"file_created","full_description":"/a/b.txt","med_description":"/a","short_description":"/"}
{"file_id":9,"artifact_id":30,"time":200,"sub_type":"web_history","full_description":"https://x.org/p","med_description":"x.org/p","short_description":"x.org","hash_sets":["nsrl"]}
"#;

    #[test]
    fn ingests_feed_and_records_progress() {
        let store = EventStore::open_in_memory().unwrap();
        let rx = store.subscribe();
        let summary = ingest(&store, Cursor::new(FEED)).unwrap();
        assert_eq!(summary, IngestSummary { inserted: 2, failed: 0 });
        assert_eq!(store.count_all_events(), 2);
        assert_eq!(store.last_object_id(), 9);
        assert_eq!(store.last_artifact_id(), 30);
        assert!(!store.was_ingest_running());
        assert_eq!(store.hash_set_names().len(), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn malformed_line_leaves_store_untouched() {
        let store = EventStore::open_in_memory().unwrap();
        let feed = format!("{FEED}\n{{\"file_id\": \"nope\"}}\n");
        let err = ingest(&store, Cursor::new(feed)).unwrap_err();
        assert!(err.to_string().contains("line"));
        assert_eq!(store.count_all_events(), 0);
        assert!(!store.was_ingest_running());
    }
}
