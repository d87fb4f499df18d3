//! Event CRUD, hash-set registry and the `db_info` bookkeeping table.

use crate::error::{Result, StoreError};
use crate::predicate::{range_scan, translate};
use crate::schema;
use crate::store::{EventStore, EventTransaction};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, BTreeSet};
use timeline_core::{EventId, Filter, KnownState, NewEvent, SubType, TimeRange, TimelineEvent};
use tracing::error;

const EVENT_COLUMNS: &str = "event_id, datasource_id, file_id, artifact_id, time, sub_type, \
     full_description, med_description, short_description, known_state, hash_hit, tagged";

/// Keys of the `db_info` table. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbInfoKey {
    LastArtifactId,
    LastObjectId,
    WasIngestRunning,
}

impl DbInfoKey {
    pub fn as_str(self) -> &'static str {
        match self {
            DbInfoKey::LastArtifactId => "last_artifact_id",
            DbInfoKey::LastObjectId => "last_object_id",
            DbInfoKey::WasIngestRunning => "was_ingest_running",
        }
    }
}

impl EventTransaction<'_> {
    /// Insert an event and record its hash-set hits. Returns the new id, or
    /// `None` if the insert failed (logged).
    ///
    /// # Panics
    /// If the transaction is already closed.
    pub fn insert_event(&mut self, event: &NewEvent) -> Option<EventId> {
        match insert_row(self.conn(), event) {
            Ok(id) => {
                self.record_inserted(id);
                Some(id)
            }
            Err(e) => {
                error!(file_id = event.file_id, error = %e, "failed to insert event");
                None
            }
        }
    }

    /// Register `hash_set_name`, record that `event_id` hit it and raise the
    /// event's `hash_hit` flag. Repeating the call is a no-op.
    pub fn add_hash_hit(&mut self, event_id: EventId, hash_set_name: &str) {
        if let Err(e) = record_hash_hit(self.conn(), event_id, hash_set_name) {
            error!(event_id, hash_set_name, error = %e, "failed to record hash hit");
        }
    }
}

fn insert_row(conn: &Connection, event: &NewEvent) -> Result<EventId> {
    conn.prepare_cached(
        "INSERT INTO events (datasource_id, file_id, artifact_id, time, sub_type, base_type,
             full_description, med_description, short_description, known_state, hash_hit, tagged)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?
    .execute(params![
        event.datasource_id,
        event.file_id,
        event.artifact_id,
        event.time,
        event.sub_type.code(),
        event.base_type().code(),
        event.full_description,
        event.med_description,
        event.short_description,
        event.known.code(),
        event.hash_hit(),
        event.tagged,
    ])?;
    let event_id = conn.last_insert_rowid();
    for name in &event.hash_sets {
        record_hash_hit(conn, event_id, name)?;
    }
    Ok(event_id)
}

fn record_hash_hit(conn: &Connection, event_id: EventId, name: &str) -> Result<()> {
    conn.prepare_cached("INSERT OR IGNORE INTO hash_sets (hash_set_name) VALUES (?1)")?
        .execute([name])?;
    conn.prepare_cached(
        "INSERT OR IGNORE INTO hash_set_hits (hash_set_id, event_id)
         SELECT hash_set_id, ?2 FROM hash_sets WHERE hash_set_name = ?1",
    )?
    .execute(params![name, event_id])?;
    conn.prepare_cached("UPDATE events SET hash_hit = 1 WHERE event_id = ?1")?
        .execute([event_id])?;
    Ok(())
}

fn map_event_row(row: &Row<'_>) -> Result<TimelineEvent> {
    let event_id: EventId = row.get(0)?;
    let sub_code: Option<i64> = row.get(5)?;
    let sub_type = sub_code
        .and_then(SubType::from_code)
        .ok_or_else(|| StoreError::CorruptRow {
            event_id,
            detail: format!("unknown sub_type {sub_code:?}"),
        })?;
    let known_code: Option<i64> = row.get(9)?;
    Ok(TimelineEvent {
        event_id,
        datasource_id: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
        file_id: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
        artifact_id: row.get(3)?,
        time: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        sub_type,
        full_description: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        med_description: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        short_description: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        known: known_code
            .and_then(KnownState::from_code)
            .unwrap_or_default(),
        hash_hit: row.get::<_, Option<i64>>(10)?.unwrap_or(0) != 0,
        tagged: row.get::<_, Option<i64>>(11)?.unwrap_or(0) != 0,
    })
}

/// Read a nullable aggregate such as `MIN(time)`.
fn query_optional_i64(conn: &Connection, sql: &str) -> Result<Option<i64>> {
    Ok(conn.query_row(sql, [], |row| row.get::<_, Option<i64>>(0))?)
}

impl EventStore {
    /// Insert one event in its own transaction and notify subscribers.
    pub fn insert_event(&self, event: &NewEvent) -> Option<EventId> {
        let mut tx = self.begin_transaction();
        let id = tx.insert_event(event);
        tx.commit(true);
        id
    }

    pub fn get_event_by_id(&self, event_id: EventId) -> Option<TimelineEvent> {
        self.with_conn("exception while querying for event by id", None, |conn| {
            let mut stmt =
                conn.prepare_cached(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"))?;
            let mut rows = stmt.query([event_id])?;
            let event = match rows.next()? {
                Some(row) => Some(map_event_row(row)?),
                None => None,
            };
            Ok(event)
        })
    }

    /// Ids of events in `range` (normalized) that pass `filter`.
    pub fn event_ids(&self, range: &TimeRange, filter: &Filter) -> BTreeSet<EventId> {
        let scan = range_scan(range, filter);
        let sql = format!(
            "SELECT DISTINCT events.event_id FROM {} WHERE {}",
            scan.from, scan.where_clause
        );
        self.with_conn("failed to execute query for event ids in range", BTreeSet::new(), |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let ids = stmt
                .query_map(params_from_iter(scan.params.iter()), |row| row.get(0))?
                .collect::<rusqlite::Result<BTreeSet<EventId>>>()?;
            Ok(ids)
        })
    }

    /// Earliest event time, or `-1` when the store is empty.
    pub fn min_time(&self) -> i64 {
        self.with_conn("failed to get MIN time", -1, |conn| {
            Ok(query_optional_i64(conn, "SELECT MIN(time) FROM events")?.unwrap_or(-1))
        })
    }

    /// Latest event time, or `-1` when the store is empty.
    pub fn max_time(&self) -> i64 {
        self.with_conn("failed to get MAX time", -1, |conn| {
            Ok(query_optional_i64(conn, "SELECT MAX(time) FROM events")?.unwrap_or(-1))
        })
    }

    /// Total number of events, or `-1` on error.
    pub fn count_all_events(&self) -> i64 {
        self.with_conn("error counting all events", -1, |conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
        })
    }

    /// `[min, max + 1)` over the given events, or `None` if none exist.
    pub fn spanning_interval(&self, event_ids: &[EventId]) -> Option<TimeRange> {
        if event_ids.is_empty() {
            return None;
        }
        let ids_json = match serde_json::to_string(event_ids) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "could not encode event ids");
                return None;
            }
        };
        self.with_conn("error executing get spanning interval query", None, |conn| {
            let (min, max): (Option<i64>, Option<i64>) = conn.query_row(
                "SELECT MIN(time), MAX(time) FROM events
                 WHERE event_id IN (SELECT value FROM json_each(?1))",
                [ids_json],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(min.zip(max).map(|(min, max)| TimeRange::new(min, max + 1)))
        })
    }

    /// Widen `range` to the nearest matching events outside it: the latest
    /// one at or before `range.start` and the earliest one at or after
    /// `range.end`. A side with no such event falls back to `range.start`
    /// and to one past the store's max time.
    pub fn bounding_events_interval(&self, range: &TimeRange, filter: &Filter) -> Option<TimeRange> {
        let predicate = translate(filter);
        let from = predicate.from_clause();
        let sql = format!(
            "SELECT (SELECT MAX(events.time) FROM {from} WHERE events.time <= ? AND ({clause})),
                    (SELECT MIN(events.time) FROM {from} WHERE events.time >= ? AND ({clause})),
                    (SELECT MAX(time) FROM events)",
            clause = predicate.clause
        );
        let mut params = vec![rusqlite::types::Value::Integer(range.start)];
        params.extend(predicate.params.iter().cloned());
        params.push(rusqlite::types::Value::Integer(range.end));
        params.extend(predicate.params.iter().cloned());

        self.with_conn("failed to get bounding events interval", None, |conn| {
            let (before, after, max): (Option<i64>, Option<i64>, Option<i64>) = conn.query_row(
                &sql,
                params_from_iter(params.iter()),
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            let start = before.unwrap_or(range.start);
            let end = match after.or(max) {
                Some(t) => t + 1,
                None => range.end,
            };
            Ok(Some(TimeRange::new(start, end.max(start + 1))))
        })
    }

    /// Set `tagged` on every event from the given file and artifact
    /// (`None` matches events without an artifact). Returns the affected ids.
    pub fn mark_events_tagged(
        &self,
        file_id: i64,
        artifact_id: Option<i64>,
        tagged: bool,
    ) -> BTreeSet<EventId> {
        self.with_conn("failed to mark events tagged", BTreeSet::new(), |conn| {
            let tx = conn.unchecked_transaction()?;
            let ids = tx
                .prepare_cached("SELECT event_id FROM events WHERE file_id = ?1 AND artifact_id IS ?2")?
                .query_map(params![file_id, artifact_id], |row| row.get(0))?
                .collect::<rusqlite::Result<BTreeSet<EventId>>>()?;
            tx.execute(
                "UPDATE events SET tagged = ?3 WHERE file_id = ?1 AND artifact_id IS ?2",
                params![file_id, artifact_id, tagged],
            )?;
            tx.commit()?;
            Ok(ids)
        })
    }

    /// Registered hash sets by id.
    pub fn hash_set_names(&self) -> BTreeMap<i64, String> {
        self.with_conn("failed to get hash sets", BTreeMap::new(), |conn| {
            let mut stmt = conn.prepare("SELECT hash_set_id, hash_set_name FROM hash_sets")?;
            let sets = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<BTreeMap<i64, String>>>()?;
            Ok(sets)
        })
    }

    /// Distinct data source ids. `0` is the column default, not a real
    /// source, and is left out.
    pub fn data_source_ids(&self) -> BTreeSet<i64> {
        self.with_conn("failed to get data source ids", BTreeSet::new(), |conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT datasource_id FROM events WHERE datasource_id != 0")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<BTreeSet<i64>>>()?;
            Ok(ids)
        })
    }

    /// True when every migrated column exists and data source ids have been
    /// recorded, i.e. the store was populated by a current ingester.
    pub fn has_new_columns(&self) -> bool {
        let migrated = {
            let conn = self.lock();
            schema::schema_version(&conn) >= schema::LATEST_VERSION
        };
        migrated && !self.data_source_ids().is_empty()
    }

    pub fn db_info(&self, key: DbInfoKey, default: i64) -> i64 {
        self.with_conn("failed to read key from db_info", default, |conn| {
            let value: Option<Option<i64>> = conn
                .prepare_cached("SELECT value FROM db_info WHERE key = ?1")?
                .query_row([key.as_str()], |row| row.get(0))
                .optional()?;
            Ok(value.flatten().unwrap_or(default))
        })
    }

    pub fn record_db_info(&self, key: DbInfoKey, value: i64) {
        self.with_conn("failed to set db_info key", (), |conn| {
            conn.prepare_cached("INSERT OR REPLACE INTO db_info (key, value) VALUES (?1, ?2)")?
                .execute(params![key.as_str(), value])?;
            Ok(())
        })
    }

    /// Last artifact id ingested, `-1` if none.
    pub fn last_artifact_id(&self) -> i64 {
        self.db_info(DbInfoKey::LastArtifactId, -1)
    }

    /// Last content object id ingested, `-1` if none.
    pub fn last_object_id(&self) -> i64 {
        self.db_info(DbInfoKey::LastObjectId, -1)
    }

    /// Whether an ingest was still running at last shutdown.
    pub fn was_ingest_running(&self) -> bool {
        self.db_info(DbInfoKey::WasIngestRunning, 0) != 0
    }

    pub fn record_last_artifact_id(&self, id: i64) {
        self.record_db_info(DbInfoKey::LastArtifactId, id);
    }

    pub fn record_last_object_id(&self, id: i64) {
        self.record_db_info(DbInfoKey::LastObjectId, id);
    }

    pub fn record_was_ingest_running(&self, running: bool) {
        self.record_db_info(DbInfoKey::WasIngestRunning, i64::from(running));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_core::{BaseType, DescriptionLod, EventType, TypeZoomLevel, ZoomParams};

    fn store() -> EventStore {
        EventStore::open_in_memory().unwrap()
    }

    fn ids(v: &[EventId]) -> BTreeSet<EventId> {
        v.iter().copied().collect()
    }

    fn sample() -> NewEvent {
        NewEvent {
            datasource_id: 3,
            file_id: 11,
            artifact_id: Some(99),
            time: 1_700_000_000,
            sub_type: SubType::WebHistory,
            full_description: "https://example.com/a/b?q=1".into(),
            med_description: "https://example.com/a".into(),
            short_description: "example.com".into(),
            known: KnownState::Notable,
            hash_sets: ["nsrl".to_string()].into_iter().collect(),
            tagged: true,
        }
    }

    #[test]
    fn insert_then_get_round_trips() {
        let store = store();
        let id = store.insert_event(&sample()).unwrap();
        let fetched = store.get_event_by_id(id).unwrap();
        assert_eq!(fetched, sample().into_event(id));
        assert_eq!(fetched.base_type(), BaseType::WebActivity);

        let stored_base: i64 = store
            .lock()
            .query_row("SELECT base_type FROM events WHERE event_id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(stored_base, BaseType::WebActivity.code());
    }

    #[test]
    fn missing_event_is_none() {
        assert!(store().get_event_by_id(12345).is_none());
    }

    #[test]
    fn ids_assigned_monotonically() {
        let store = store();
        let a = store.insert_event(&NewEvent::new(1, 5, SubType::Exif, "a")).unwrap();
        let b = store.insert_event(&NewEvent::new(1, 1, SubType::Exif, "b")).unwrap();
        assert!(b > a);
    }

    #[test]
    fn empty_store_sentinels() {
        let store = store();
        assert_eq!(store.min_time(), -1);
        assert_eq!(store.max_time(), -1);
        assert_eq!(store.count_all_events(), 0);
        assert!(store.spanning_interval(&[1, 2]).is_none());
        assert!(store.hash_set_names().is_empty());
    }

    #[test]
    fn min_max_and_spanning_interval() {
        let store = store();
        let a = store.insert_event(&NewEvent::new(1, 100, SubType::Exif, "a")).unwrap();
        let _ = store.insert_event(&NewEvent::new(1, 50, SubType::Exif, "b")).unwrap();
        let c = store.insert_event(&NewEvent::new(1, 300, SubType::Exif, "c")).unwrap();
        assert_eq!(store.min_time(), 50);
        assert_eq!(store.max_time(), 300);
        assert_eq!(store.spanning_interval(&[a, c]), Some(TimeRange::new(100, 301)));
    }

    #[test]
    fn event_ids_respects_half_open_range_and_filter() {
        let store = store();
        let a = store.insert_event(&NewEvent::new(1, 10, SubType::Email, "mail")).unwrap();
        let b = store.insert_event(&NewEvent::new(1, 20, SubType::FileCreated, "f")).unwrap();
        let _c = store.insert_event(&NewEvent::new(1, 30, SubType::Email, "mail")).unwrap();

        assert_eq!(store.event_ids(&TimeRange::new(10, 30), &Filter::All), ids(&[a, b]));
        let only_fs = Filter::types([EventType::Base(BaseType::FileSystem)]);
        assert_eq!(store.event_ids(&TimeRange::new(0, 100), &only_fs), ids(&[b]));
    }

    #[test]
    fn empty_range_behaves_like_one_second() {
        let store = store();
        let a = store.insert_event(&NewEvent::new(1, 10, SubType::Email, "m")).unwrap();
        let _ = store.insert_event(&NewEvent::new(1, 11, SubType::Email, "m")).unwrap();
        let empty = store.event_ids(&TimeRange::new(10, 10), &Filter::All);
        assert_eq!(empty, store.event_ids(&TimeRange::new(10, 11), &Filter::All));
        assert_eq!(empty, ids(&[a]));
    }

    #[test]
    fn hash_sets_registered_once_and_hits_deduplicated() {
        let store = store();
        let mut e1 = NewEvent::new(1, 10, SubType::FileCreated, "a");
        e1.hash_sets = ["nsrl".into(), "malware".into()].into_iter().collect();
        let mut e2 = NewEvent::new(2, 20, SubType::FileCreated, "b");
        e2.hash_sets = ["malware".into()].into_iter().collect();

        let mut tx = store.begin_transaction();
        let id1 = tx.insert_event(&e1).unwrap();
        tx.insert_event(&e2).unwrap();
        tx.add_hash_hit(id1, "malware");
        tx.add_hash_hit(id1, "malware");
        tx.commit(false);

        let names: Vec<String> = store.hash_set_names().into_values().collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"nsrl".to_string()));
        let hits: i64 = store
            .lock()
            .query_row("SELECT COUNT(*) FROM hash_set_hits", [], |r| r.get(0))
            .unwrap();
        assert_eq!(hits, 3);
    }

    #[test]
    fn hash_filter_and_its_negation_partition_events() {
        let store = store();
        let mut both = NewEvent::new(1, 10, SubType::FileCreated, "a");
        both.hash_sets = ["nsrl".into(), "malware".into()].into_iter().collect();
        let mut only_nsrl = NewEvent::new(2, 20, SubType::FileCreated, "b");
        only_nsrl.hash_sets = ["nsrl".into()].into_iter().collect();
        let plain = NewEvent::new(3, 30, SubType::FileCreated, "c");

        let a = store.insert_event(&both).unwrap();
        let b = store.insert_event(&only_nsrl).unwrap();
        let c = store.insert_event(&plain).unwrap();

        let range = TimeRange::new(0, 100);
        let malware = Filter::hash_sets(["malware"]);
        assert_eq!(store.event_ids(&range, &malware), ids(&[a]));
        assert_eq!(
            store.event_ids(&range, &Filter::Not(Box::new(malware))),
            ids(&[b, c])
        );
        let either = Filter::Union(vec![Filter::hash_sets(["nsrl"]), Filter::text("c")]);
        assert_eq!(store.event_ids(&range, &either), ids(&[a, b, c]));
    }

    #[test]
    fn late_hash_hit_raises_event_flag() {
        let store = store();
        let plain = NewEvent::new(1, 10, SubType::FileCreated, "a");
        let mut tx = store.begin_transaction();
        let id = tx.insert_event(&plain).unwrap();
        tx.add_hash_hit(id, "malware");
        tx.commit(false);

        assert!(store.get_event_by_id(id).unwrap().hash_hit);
        let range = TimeRange::new(0, 100);
        assert_eq!(store.event_ids(&range, &Filter::hash_sets(["malware"])), ids(&[id]));
        let params = ZoomParams::new(range, Filter::All, TypeZoomLevel::BaseType, DescriptionLod::Full);
        let groups = store.aggregated_events(&params);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].hash_hits, ids(&[id]));
    }

    #[test]
    fn intersection_of_hash_filters_needs_every_set() {
        let store = store();
        let mut both = NewEvent::new(1, 10, SubType::FileCreated, "a");
        both.hash_sets = ["a".into(), "b".into()].into_iter().collect();
        let mut only_a = NewEvent::new(2, 20, SubType::FileCreated, "b");
        only_a.hash_sets = ["a".into()].into_iter().collect();
        let x = store.insert_event(&both).unwrap();
        let y = store.insert_event(&only_a).unwrap();

        let range = TimeRange::new(0, 100);
        let a_and_b = Filter::hash_sets(["a"]).and(Filter::hash_sets(["b"]));
        assert_eq!(store.event_ids(&range, &a_and_b), ids(&[x]));
        let a_not_b = Filter::hash_sets(["a"]).and(Filter::Not(Box::new(Filter::hash_sets(["b"]))));
        assert_eq!(store.event_ids(&range, &a_not_b), ids(&[y]));
        let params = ZoomParams::new(range, a_and_b, TypeZoomLevel::BaseType, DescriptionLod::Full);
        let per_type = store.count_events_by_type(&params);
        assert_eq!(per_type.values().sum::<u64>(), 1);
    }

    #[test]
    fn text_filter_matches_any_description_case_insensitively() {
        let store = store();
        let mut e = NewEvent::new(1, 10, SubType::WebHistory, "x");
        e.full_description = "https://Example.com/Path".into();
        let a = store.insert_event(&e).unwrap();
        let _ = store.insert_event(&NewEvent::new(1, 11, SubType::WebHistory, "other")).unwrap();
        assert_eq!(
            store.event_ids(&TimeRange::new(0, 100), &Filter::text("example.COM")),
            ids(&[a])
        );
    }

    #[test]
    fn mark_tagged_by_provenance_with_null_artifact() {
        let store = store();
        let file_only = store.insert_event(&NewEvent::new(7, 10, SubType::FileModified, "f")).unwrap();
        let file_only2 = store.insert_event(&NewEvent::new(7, 20, SubType::FileAccessed, "f")).unwrap();
        let mut with_artifact = NewEvent::new(7, 30, SubType::Exif, "photo");
        with_artifact.artifact_id = Some(5);
        let artifact_event = store.insert_event(&with_artifact).unwrap();
        let other_file = store.insert_event(&NewEvent::new(8, 40, SubType::FileModified, "g")).unwrap();

        let affected = store.mark_events_tagged(7, None, true);
        assert_eq!(affected, ids(&[file_only, file_only2]));
        for id in &affected {
            assert!(store.get_event_by_id(*id).unwrap().tagged);
        }
        assert!(!store.get_event_by_id(artifact_event).unwrap().tagged);
        assert!(!store.get_event_by_id(other_file).unwrap().tagged);

        assert_eq!(store.mark_events_tagged(7, Some(5), true), ids(&[artifact_event]));
        assert_eq!(store.mark_events_tagged(7, None, false), ids(&[file_only, file_only2]));
        assert!(!store.get_event_by_id(file_only).unwrap().tagged);
        assert_eq!(
            store.event_ids(&TimeRange::new(0, 100), &Filter::Tagged),
            ids(&[artifact_event])
        );
    }

    #[test]
    fn bounding_interval_reaches_nearest_outside_events() {
        let store = store();
        for t in [100, 200, 500, 900] {
            store.insert_event(&NewEvent::new(1, t, SubType::Email, "m")).unwrap();
        }
        assert_eq!(
            store.bounding_events_interval(&TimeRange::new(250, 600), &Filter::All),
            Some(TimeRange::new(200, 901))
        );
        // Nothing before 50: start stays; nothing after 950: end is max + 1.
        assert_eq!(
            store.bounding_events_interval(&TimeRange::new(50, 950), &Filter::All),
            Some(TimeRange::new(50, 901))
        );
        let empty = EventStore::open_in_memory().unwrap();
        assert_eq!(
            empty.bounding_events_interval(&TimeRange::new(10, 20), &Filter::All),
            Some(TimeRange::new(10, 20))
        );
    }

    #[test]
    fn db_info_defaults_and_updates() {
        let store = store();
        assert_eq!(store.last_artifact_id(), -1);
        assert_eq!(store.last_object_id(), -1);
        assert!(!store.was_ingest_running());

        store.record_last_artifact_id(40);
        store.record_last_object_id(41);
        store.record_was_ingest_running(true);
        assert_eq!(store.last_artifact_id(), 40);
        assert_eq!(store.last_object_id(), 41);
        assert!(store.was_ingest_running());

        store.record_last_object_id(50);
        assert_eq!(store.last_object_id(), 50);
    }

    #[test]
    fn new_columns_require_a_data_source() {
        let store = store();
        assert!(!store.has_new_columns());
        store.insert_event(&NewEvent::new(1, 10, SubType::Email, "m")).unwrap();
        assert!(!store.has_new_columns());
        store.insert_event(&sample()).unwrap();
        assert!(store.has_new_columns());
        assert_eq!(store.data_source_ids(), ids(&[3]));
    }

    #[test]
    fn query_fault_degrades_and_store_stays_usable() {
        let store = store();
        store.insert_event(&NewEvent::new(1, 10, SubType::Email, "m")).unwrap();
        store.lock().execute_batch("DROP TABLE events").unwrap();
        assert_eq!(store.count_all_events(), -1);
        assert_eq!(store.min_time(), -1);
        assert!(store.event_ids(&TimeRange::new(0, 100), &Filter::All).is_empty());
        store.reinitialize();
        assert_eq!(store.count_all_events(), 0);
    }
}
