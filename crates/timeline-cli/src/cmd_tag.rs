use crate::case::Case;
use std::path::Path;
use timeline_store::CaseLock;

/// `timeline tag --file-id N [--artifact-id M] [--untag]`
pub fn execute(
    repo_root: &Path,
    file_id: i64,
    artifact_id: Option<i64>,
    untag: bool,
) -> anyhow::Result<()> {
    let case = Case::open(repo_root)?;
    let _lock = CaseLock::acquire(&case.paths, "tag")?;

    let affected = case.store.mark_events_tagged(file_id, artifact_id, !untag);
    let verb = if untag { "Untagged" } else { "Tagged" };
    println!("{verb} {} events.", affected.len());
    Ok(())
}
