//! Per-type counts and the aggregation query behind the zoomed timeline view.

use crate::error::Result;
use crate::predicate::range_scan;
use crate::store::EventStore;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::{BTreeMap, BTreeSet};
use time::UtcOffset;
use timeline_core::{
    merge_adjacent, AggregateEvent, BaseType, DescriptionLod, EventId, EventType, RangeDivision,
    Span, SubType, TimeUnit, TypeZoomLevel, ZoomParams,
};
use tracing::{debug, warn};

fn type_column(zoom: TypeZoomLevel) -> &'static str {
    match zoom {
        TypeZoomLevel::BaseType => "base_type",
        TypeZoomLevel::SubType => "sub_type",
    }
}

fn description_column(lod: DescriptionLod) -> &'static str {
    match lod {
        DescriptionLod::Full => "full_description",
        DescriptionLod::Medium => "med_description",
        DescriptionLod::Short => "short_description",
    }
}

/// SQL naming the bucket of `events.time`. Binds the [`bucket_format`] of the
/// unit, then the display offset in seconds.
const BUCKET_KEY: &str = "strftime(?, events.time + ?, 'unixepoch')";

fn bucket_bind(unit: TimeUnit, offset: UtcOffset) -> [Value; 2] {
    [
        Value::Text(bucket_format(unit).to_string()),
        Value::Integer(i64::from(offset.whole_seconds())),
    ]
}

/// `strftime` format naming the bucket a timestamp falls into.
fn bucket_format(unit: TimeUnit) -> &'static str {
    match unit {
        TimeUnit::Seconds => "%Y-%m-%dT%H:%M:%S",
        TimeUnit::Minutes => "%Y-%m-%dT%H:%M",
        TimeUnit::Hours => "%Y-%m-%dT%H",
        TimeUnit::Days => "%Y-%m-%d",
        TimeUnit::Months => "%Y-%m",
        TimeUnit::Years => "%Y",
    }
}

fn event_type_from_code(zoom: TypeZoomLevel, code: i64) -> Option<EventType> {
    match zoom {
        TypeZoomLevel::BaseType => BaseType::from_code(code).map(EventType::Base),
        TypeZoomLevel::SubType => SubType::from_code(code).map(EventType::Sub),
    }
}

/// One row of the grouped query, before flags are attached.
struct BucketRow {
    ids: BTreeSet<EventId>,
    min_time: i64,
    max_time: i64,
    type_code: i64,
    description: String,
}

fn parse_id_list(concatenated: &str) -> BTreeSet<EventId> {
    concatenated
        .split(',')
        .filter_map(|id| id.trim().parse().ok())
        .collect()
}

/// Member ids with the `hash_hit` and `tagged` flags set, in that order.
fn flagged_ids(
    conn: &Connection,
    ids: &BTreeSet<EventId>,
) -> Result<(BTreeSet<EventId>, BTreeSet<EventId>)> {
    let mut hash_hits = BTreeSet::new();
    let mut tagged = BTreeSet::new();
    if ids.is_empty() {
        return Ok((hash_hits, tagged));
    }
    let ids_json = serde_json::to_string(ids)?;
    let mut stmt = conn.prepare(
        "SELECT event_id, hash_hit, tagged FROM events
         WHERE event_id IN (SELECT value FROM json_each(?1))",
    )?;
    let mut rows = stmt.query([ids_json])?;
    while let Some(row) = rows.next()? {
        let id: EventId = row.get(0)?;
        if row.get::<_, Option<i64>>(1)?.unwrap_or(0) != 0 {
            hash_hits.insert(id);
        }
        if row.get::<_, Option<i64>>(2)?.unwrap_or(0) != 0 {
            tagged.insert(id);
        }
    }
    Ok((hash_hits, tagged))
}

impl EventStore {
    /// Number of matching events per type at the requested zoom level.
    /// Types with no events are absent.
    pub fn count_events_by_type(&self, params: &ZoomParams) -> BTreeMap<EventType, u64> {
        let column = type_column(params.type_zoom);
        let scan = range_scan(&params.range, &params.filter);
        let sql = format!(
            "SELECT events.{column}, COUNT(DISTINCT events.event_id) FROM {} WHERE {}
             GROUP BY events.{column}",
            scan.from, scan.where_clause
        );
        self.with_conn("failed to get count of all events", BTreeMap::new(), |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(scan.params.iter()))?;
            let mut counts = BTreeMap::new();
            while let Some(row) = rows.next()? {
                let code: i64 = row.get(0)?;
                let count: i64 = row.get(1)?;
                match event_type_from_code(params.type_zoom, code) {
                    Some(ty) => {
                        counts.insert(ty, u64::try_from(count).unwrap_or(0));
                    }
                    None => warn!(code, column, "skipping unknown type code"),
                }
            }
            Ok(counts)
        })
    }

    /// Aggregate matching events by type, description and time bucket, then
    /// merge neighbouring groups per [`merge_adjacent`].
    ///
    /// The bucket unit comes from the range length; buckets are cut in the
    /// store's display offset.
    pub fn aggregated_events(&self, params: &ZoomParams) -> Vec<AggregateEvent> {
        let offset = self.display_offset();
        let division = RangeDivision::for_range(&params.range);
        let type_col = type_column(params.type_zoom);
        let desc_col = description_column(params.lod);
        let scan = range_scan(&params.range, &params.filter);

        let sql = format!(
            "SELECT group_concat(DISTINCT events.event_id), MIN(events.time), MAX(events.time),
                    events.{type_col}, events.{desc_col},
                    {BUCKET_KEY} AS bucket
             FROM {} WHERE {}
             GROUP BY bucket, events.{type_col}, events.{desc_col}",
            scan.from, scan.where_clause
        );
        let mut bind = bucket_bind(division.unit, offset).to_vec();
        bind.extend(scan.params.iter().cloned());

        let groups = self.with_conn("failed to get aggregate events", Vec::new(), |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let buckets = stmt
                .query_map(params_from_iter(bind.iter()), |row| {
                    let ids: Option<String> = row.get(0)?;
                    Ok(BucketRow {
                        ids: ids.as_deref().map(parse_id_list).unwrap_or_default(),
                        min_time: row.get(1)?,
                        max_time: row.get(2)?,
                        type_code: row.get(3)?,
                        description: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let all_ids: BTreeSet<EventId> =
                buckets.iter().flat_map(|b| b.ids.iter().copied()).collect();
            let (hash_hits, tagged) = flagged_ids(conn, &all_ids)?;

            let mut groups = Vec::with_capacity(buckets.len());
            for bucket in buckets {
                let Some(event_type) = event_type_from_code(params.type_zoom, bucket.type_code)
                else {
                    warn!(code = bucket.type_code, "skipping unknown type code");
                    continue;
                };
                groups.push(AggregateEvent {
                    span: Span::new(bucket.min_time, bucket.max_time),
                    event_type,
                    description: bucket.description,
                    hash_hits: bucket.ids.intersection(&hash_hits).copied().collect(),
                    tagged: bucket.ids.intersection(&tagged).copied().collect(),
                    event_ids: bucket.ids,
                    lod: params.lod,
                });
            }
            Ok(groups)
        });

        debug!(groups = groups.len(), unit = ?division.unit, "aggregated events");
        merge_adjacent(groups, division.unit)
    }
}
