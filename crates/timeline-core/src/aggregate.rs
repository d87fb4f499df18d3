//! Aggregate events and the in-memory merge step of the aggregation query.

use crate::types::{DescriptionLod, EventId, EventType};
use crate::zoom::{TimeRange, TimeUnit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Earliest and latest member timestamps of an aggregate (both inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: i64,
    pub end: i64,
}

impl Span {
    pub fn new(start: i64, end: i64) -> Self {
        debug_assert!(start <= end, "span start {start} after end {end}");
        Self { start, end }
    }

    /// Seconds strictly between `self` and a later span, or `None` when the
    /// two overlap or touch.
    pub fn gap_to(&self, next: &Span) -> Option<i64> {
        if next.start <= self.end {
            None
        } else {
            Some(next.start - self.end)
        }
    }

    pub fn union(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Half-open range covering every member: `[start, end + 1)`.
    pub fn as_range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end + 1)
    }
}

/// A group of events with the same type and description, coalesced over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateEvent {
    pub span: Span,
    pub event_type: EventType,
    pub description: String,
    pub event_ids: BTreeSet<EventId>,
    /// Members that hit a hash set.
    pub hash_hits: BTreeSet<EventId>,
    /// Members that are tagged.
    pub tagged: BTreeSet<EventId>,
    pub lod: DescriptionLod,
}

impl AggregateEvent {
    pub fn count(&self) -> usize {
        self.event_ids.len()
    }

    /// Combine two aggregates of the same type and description.
    ///
    /// # Panics
    /// If type, description or level differ: that is a caller bug.
    pub fn merge(mut self, other: AggregateEvent) -> AggregateEvent {
        assert!(
            self.event_type == other.event_type
                && self.description == other.description
                && self.lod == other.lod,
            "cannot merge aggregates with different type/description: {:?}/{:?} vs {:?}/{:?}",
            self.event_type,
            self.description,
            other.event_type,
            other.description,
        );
        self.span = self.span.union(&other.span);
        self.event_ids.extend(other.event_ids);
        self.hash_hits.extend(other.hash_hits);
        self.tagged.extend(other.tagged);
        self
    }
}

/// Merge per-bucket groups into aggregate spans.
///
/// Groups are keyed by `(event_type, description)`. Within a key they are
/// walked in start order and folded together while the gap between the
/// running aggregate and the next group is absent or at most a quarter of
/// `unit`. Output is ordered by `(span.start, event_type, description)`.
pub fn merge_adjacent(groups: Vec<AggregateEvent>, unit: TimeUnit) -> Vec<AggregateEvent> {
    let tolerance = unit.merge_tolerance();

    let mut by_key: BTreeMap<(EventType, String), Vec<AggregateEvent>> = BTreeMap::new();
    for group in groups {
        by_key
            .entry((group.event_type, group.description.clone()))
            .or_default()
            .push(group);
    }

    let mut merged = Vec::new();
    for (_, mut bucket_groups) in by_key {
        bucket_groups.sort_by_key(|g| (g.span.start, g.span.end));
        let mut iter = bucket_groups.into_iter();
        let Some(mut current) = iter.next() else {
            continue;
        };
        for next in iter {
            match current.span.gap_to(&next.span) {
                Some(gap) if gap > tolerance => {
                    merged.push(current);
                    current = next;
                }
                _ => current = current.merge(next),
            }
        }
        merged.push(current);
    }

    merged.sort_by(|a, b| {
        (a.span.start, a.event_type, &a.description).cmp(&(b.span.start, b.event_type, &b.description))
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BaseType, SubType};

    const DAY: i64 = 86_400;

    fn group(ty: EventType, desc: &str, ids: &[i64], start: i64, end: i64) -> AggregateEvent {
        AggregateEvent {
            span: Span::new(start, end),
            event_type: ty,
            description: desc.to_string(),
            event_ids: ids.iter().copied().collect(),
            hash_hits: BTreeSet::new(),
            tagged: BTreeSet::new(),
            lod: DescriptionLod::Short,
        }
    }

    fn ids(v: &[i64]) -> BTreeSet<i64> {
        v.iter().copied().collect()
    }

    fn fs() -> EventType {
        EventType::Base(BaseType::FileSystem)
    }

    #[test]
    fn gap_is_none_for_touching_spans() {
        let a = Span::new(0, 10);
        assert_eq!(a.gap_to(&Span::new(10, 20)), None);
        assert_eq!(a.gap_to(&Span::new(5, 20)), None);
        assert_eq!(a.gap_to(&Span::new(11, 20)), Some(1));
    }

    #[test]
    fn quarter_period_gap_merges() {
        let groups = vec![
            group(fs(), "a", &[1], 0, 0),
            group(fs(), "a", &[2], DAY / 4, DAY / 4),
        ];
        let out = merge_adjacent(groups, TimeUnit::Days);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].span, Span::new(0, DAY / 4));
        assert_eq!(out[0].event_ids, ids(&[1, 2]));
    }

    #[test]
    fn gap_beyond_quarter_period_splits() {
        let groups = vec![
            group(fs(), "a", &[1], 0, 0),
            group(fs(), "a", &[2], DAY / 4 + 1, DAY / 4 + 1),
        ];
        let out = merge_adjacent(groups, TimeUnit::Days);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].event_ids, ids(&[1]));
        assert_eq!(out[1].event_ids, ids(&[2]));
    }

    #[test]
    fn different_descriptions_never_merge() {
        let groups = vec![group(fs(), "a", &[1], 0, 5), group(fs(), "b", &[2], 0, 5)];
        assert_eq!(merge_adjacent(groups, TimeUnit::Days).len(), 2);
    }

    #[test]
    fn chain_merges_transitively_and_keeps_flags() {
        let mut middle = group(fs(), "a", &[2, 3], 100, 200);
        middle.hash_hits.insert(3);
        let mut last = group(fs(), "a", &[4], 250, 260);
        last.tagged.insert(4);
        let groups = vec![last, group(fs(), "a", &[1], 0, 50), middle];
        let out = merge_adjacent(groups, TimeUnit::Hours);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].span, Span::new(0, 260));
        assert_eq!(out[0].count(), 4);
        assert_eq!(out[0].hash_hits, ids(&[3]));
        assert_eq!(out[0].tagged, ids(&[4]));
    }

    #[test]
    fn output_independent_of_input_order() {
        let make = || {
            vec![
                group(fs(), "a", &[1], 0, 10),
                group(EventType::Sub(SubType::Email), "m", &[5], 3, 3),
                group(fs(), "a", &[2], 10_000, 10_010),
                group(fs(), "b", &[3], 20, 30),
            ]
        };
        let forward = merge_adjacent(make(), TimeUnit::Minutes);
        let mut reversed_input = make();
        reversed_input.reverse();
        let backward = merge_adjacent(reversed_input, TimeUnit::Minutes);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 4);
        assert_eq!(forward[0].span.start, 0);
    }

    #[test]
    #[should_panic(expected = "cannot merge")]
    fn merging_different_types_panics() {
        let a = group(fs(), "a", &[1], 0, 0);
        let b = group(EventType::Base(BaseType::Misc), "a", &[2], 0, 0);
        let _ = a.merge(b);
    }

    #[test]
    fn span_range_is_half_open() {
        let r = Span::new(10, 20).as_range();
        assert!(r.contains(20));
        assert!(!r.contains(21));
    }
}
