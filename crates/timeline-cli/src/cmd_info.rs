use crate::case::{format_time, Case};
use std::path::Path;

/// `timeline info`
pub fn execute(repo_root: &Path, json: bool) -> anyhow::Result<()> {
    let case = Case::open(repo_root)?;
    let store = &case.store;
    let (min, max) = (store.min_time(), store.max_time());

    let info = serde_json::json!({
        "database": case.paths.events_db.display().to_string(),
        "events": store.count_all_events(),
        "min_time": min,
        "max_time": max,
        "data_sources": store.data_source_ids(),
        "hash_sets": store.hash_set_names().into_values().collect::<Vec<_>>(),
        "has_new_columns": store.has_new_columns(),
        "last_object_id": store.last_object_id(),
        "last_artifact_id": store.last_artifact_id(),
        "was_ingest_running": store.was_ingest_running(),
        "display_offset": case.config.display_offset,
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Database:        {}", case.paths.events_db.display());
    println!("Events:          {}", store.count_all_events());
    if min >= 0 {
        println!("Time span:       {} .. {}", format_time(min), format_time(max));
    } else {
        println!("Time span:       (empty)");
    }
    println!("Display offset:  {}", case.config.display_offset);
    println!("Data sources:    {:?}", store.data_source_ids());
    let sets: Vec<String> = store.hash_set_names().into_values().collect();
    println!("Hash sets:       {}", if sets.is_empty() { "(none)".into() } else { sets.join(", ") });
    println!("Last object id:  {}", store.last_object_id());
    println!("Last artifact:   {}", store.last_artifact_id());
    if store.was_ingest_running() {
        println!("Warning: an ingest was interrupted; run `timeline rebuild` and ingest again.");
    }
    Ok(())
}
