use crate::case::Case;
use std::path::Path;
use timeline_store::CaseLock;

/// `timeline rebuild`: drop every table and recreate an empty schema. The
/// events are re-derived by ingesting the case again.
pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let case = Case::open(repo_root)?;
    let _lock = CaseLock::acquire(&case.paths, "rebuild")?;

    let before = case.store.count_all_events();
    case.store.reinitialize();
    println!("Reinitialized {} ({before} events dropped).", case.paths.events_db.display());
    Ok(())
}
