use crate::case::{format_time, Case};
use std::path::Path;

/// `timeline show <id>`: one event as JSON.
pub fn execute(repo_root: &Path, event_id: i64) -> anyhow::Result<()> {
    let case = Case::open(repo_root)?;
    let Some(event) = case.store.get_event_by_id(event_id) else {
        anyhow::bail!("no event with id {event_id}");
    };
    let mut value = serde_json::to_value(&event)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("base_type".into(), serde_json::to_value(event.base_type())?);
        obj.insert("time_rfc3339".into(), format_time(event.time).into());
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
