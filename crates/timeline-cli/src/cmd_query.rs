use crate::case::{format_time, load_filter, parse_time, Case};
use std::path::{Path, PathBuf};
use timeline_core::{AggregateEvent, DescriptionLod, TimeRange, TypeZoomLevel, ZoomParams};

pub struct QueryParams<'a> {
    pub repo_root: &'a Path,
    pub start: &'a str,
    pub end: &'a str,
    pub filter: Option<&'a PathBuf>,
    pub type_zoom: TypeZoomLevel,
    pub lod: DescriptionLod,
    pub json: bool,
}

impl QueryParams<'_> {
    fn zoom(&self) -> anyhow::Result<ZoomParams> {
        let range = TimeRange::new(parse_time(self.start)?, parse_time(self.end)?);
        if range.end < range.start {
            anyhow::bail!("--end is before --start");
        }
        let filter = load_filter(self.filter.map(PathBuf::as_path))?;
        Ok(ZoomParams::new(range, filter, self.type_zoom, self.lod))
    }
}

/// `timeline aggregate`
pub fn aggregate(params: &QueryParams<'_>) -> anyhow::Result<()> {
    let case = Case::open(params.repo_root)?;
    let aggregates = case.store.aggregated_events(&params.zoom()?);

    if params.json {
        for agg in &aggregates {
            println!("{}", serde_json::to_string(agg)?);
        }
        return Ok(());
    }
    if aggregates.is_empty() {
        println!("No events in range.");
        return Ok(());
    }
    for agg in &aggregates {
        print_aggregate_line(agg);
    }
    println!("\n({} aggregates)", aggregates.len());
    Ok(())
}

fn print_aggregate_line(agg: &AggregateEvent) {
    let mut flags = String::new();
    if !agg.hash_hits.is_empty() {
        flags.push_str(&format!(" hash:{}", agg.hash_hits.len()));
    }
    if !agg.tagged.is_empty() {
        flags.push_str(&format!(" tagged:{}", agg.tagged.len()));
    }
    println!(
        "{}  {}  {:<18} {:>6}  {}{}",
        format_time(agg.span.start),
        format_time(agg.span.end),
        agg.event_type.display_name(),
        agg.count(),
        agg.description,
        flags
    );
}

/// `timeline count`
pub fn count(params: &QueryParams<'_>) -> anyhow::Result<()> {
    let case = Case::open(params.repo_root)?;
    let counts = case.store.count_events_by_type(&params.zoom()?);

    if params.json {
        let map: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(ty, n)| (ty.name().to_string(), serde_json::Value::from(*n)))
            .collect();
        println!("{}", serde_json::Value::Object(map));
        return Ok(());
    }
    for (ty, n) in &counts {
        println!("{:<20} {n:>8}", ty.display_name());
    }
    println!("{:<20} {:>8}", "total", counts.values().sum::<u64>());
    Ok(())
}

/// `timeline ids`
pub fn ids(params: &QueryParams<'_>) -> anyhow::Result<()> {
    let case = Case::open(params.repo_root)?;
    let zoom = params.zoom()?;
    let ids = case.store.event_ids(&zoom.range, &zoom.filter);

    if params.json {
        println!("{}", serde_json::to_string(&ids)?);
    } else {
        for id in &ids {
            println!("{id}");
        }
    }
    Ok(())
}
