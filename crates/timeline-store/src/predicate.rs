//! Translation of [`Filter`] trees into SQL predicates over `events`.

use rusqlite::types::Value;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use timeline_core::{EventType, Filter, TimeRange};

/// `FROM` clause for queries whose predicate touches hash-set membership.
/// Joined queries must count and collect `DISTINCT events.event_id`.
const JOINED_FROM: &str =
    "events LEFT JOIN hash_set_hits ON hash_set_hits.event_id = events.event_id";

/// A WHERE-clause fragment plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPredicate {
    pub clause: String,
    pub params: Vec<Value>,
    pub needs_hash_join: bool,
}

impl SqlPredicate {
    pub fn from_clause(&self) -> &'static str {
        if self.needs_hash_join {
            JOINED_FROM
        } else {
            "events"
        }
    }
}

/// Translate a filter tree. Pure: the same tree always gives the same SQL.
pub fn translate(filter: &Filter) -> SqlPredicate {
    let mut clause = String::new();
    let mut params = Vec::new();
    write_filter(filter, &mut clause, &mut params);
    SqlPredicate {
        clause,
        params,
        needs_hash_join: filter.references_hash_sets(),
    }
}

/// `FROM ... WHERE ...` restricted to `range` (normalized) and `filter`.
/// Parameters are the range bounds followed by the predicate's own.
pub(crate) struct RangeScan {
    pub from: &'static str,
    pub where_clause: String,
    pub params: Vec<Value>,
}

pub(crate) fn range_scan(range: &TimeRange, filter: &Filter) -> RangeScan {
    let range = range.normalized();
    let predicate = translate(filter);
    let mut params = vec![Value::Integer(range.start), Value::Integer(range.end)];
    params.extend(predicate.params.iter().cloned());
    RangeScan {
        from: predicate.from_clause(),
        where_clause: format!(
            "events.time >= ? AND events.time < ? AND ({})",
            predicate.clause
        ),
        params,
    }
}

fn write_filter(filter: &Filter, out: &mut String, params: &mut Vec<Value>) {
    match filter {
        Filter::All => out.push('1'),
        Filter::Type { types } => write_types(types, out),
        Filter::KnownState { states } => {
            write_in(out, "events.known_state", states.iter().map(|s| s.code()))
        }
        Filter::Tagged => out.push_str("events.tagged = 1"),
        Filter::HashSet { names } => {
            if names.is_empty() {
                out.push('0');
                return;
            }
            // Membership is decided per event, never per joined hit row, so
            // AND and NOT over several hash filters see all of an event's hits.
            out.push_str(
                "events.event_id IN (SELECT hash_set_hits.event_id FROM hash_set_hits \
                 JOIN hash_sets ON hash_sets.hash_set_id = hash_set_hits.hash_set_id \
                 WHERE hash_sets.hash_set_name IN (",
            );
            write_placeholders(out, names.len());
            out.push_str("))");
            params.extend(names.iter().map(|n| Value::Text(n.clone())));
        }
        Filter::DataSource { ids } => write_in(out, "events.datasource_id", ids.iter().copied()),
        Filter::Text { text } => {
            if text.is_empty() {
                out.push('1');
                return;
            }
            let pattern = format!("%{}%", escape_like(text));
            let columns = ["full_description", "med_description", "short_description"];
            out.push('(');
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    out.push_str(" OR ");
                }
                let _ = write!(out, "events.{column} LIKE ? ESCAPE '\\'");
                params.push(Value::Text(pattern.clone()));
            }
            out.push(')');
        }
        Filter::Intersection(parts) => write_compound(parts, " AND ", '1', out, params),
        Filter::Union(parts) => write_compound(parts, " OR ", '0', out, params),
        Filter::Not(inner) => {
            out.push_str("NOT (");
            write_filter(inner, out, params);
            out.push(')');
        }
    }
}

fn write_compound(
    parts: &[Filter],
    op: &str,
    empty: char,
    out: &mut String,
    params: &mut Vec<Value>,
) {
    if parts.is_empty() {
        out.push(empty);
        return;
    }
    out.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push_str(op);
        }
        out.push('(');
        write_filter(part, out, params);
        out.push(')');
    }
    out.push(')');
}

fn write_types(types: &BTreeSet<EventType>, out: &mut String) {
    let mut subs = Vec::new();
    let mut bases = Vec::new();
    for t in types {
        match t {
            EventType::Sub(s) => subs.push(s.code()),
            EventType::Base(b) => bases.push(b.code()),
        }
    }
    match (subs.is_empty(), bases.is_empty()) {
        (true, true) => out.push('0'),
        (false, true) => write_in(out, "events.sub_type", subs),
        (true, false) => write_in(out, "events.base_type", bases),
        (false, false) => {
            out.push('(');
            write_in(out, "events.sub_type", subs);
            out.push_str(" OR ");
            write_in(out, "events.base_type", bases);
            out.push(')');
        }
    }
}

/// `column IN (a, b, ...)` with integer literals, or `0` for an empty set.
fn write_in(out: &mut String, column: &str, values: impl IntoIterator<Item = i64>) {
    let list: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
    if list.is_empty() {
        out.push('0');
    } else {
        let _ = write!(out, "{column} IN ({})", list.join(", "));
    }
}

fn write_placeholders(out: &mut String, n: usize) {
    out.push_str(&vec!["?"; n].join(", "));
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
