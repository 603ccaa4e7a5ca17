//! DueQueue: deterministic view over a set of progress records.
//!
//! Ordering is due time ascending, then item ref, so two runs over the same
//! records always present items in the same order.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;

use crate::progress::{ItemProgress, ItemRef};
use crate::schedule::Phase;

#[derive(Debug, Default, Clone)]
pub struct DueQueue {
    items: BTreeMap<ItemRef, ItemProgress>,
}

impl DueQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, item: &ItemRef) -> Option<&ItemProgress> {
        self.items.get(item)
    }

    pub fn get_mut(&mut self, item: &ItemRef) -> Option<&mut ItemProgress> {
        self.items.get_mut(item)
    }

    /// Insert or replace the record for `progress.item`.
    pub fn upsert(&mut self, progress: ItemProgress) {
        self.items.insert(progress.item.clone(), progress);
    }

    pub fn remove(&mut self, item: &ItemRef) -> Option<ItemProgress> {
        self.items.remove(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemProgress> {
        self.items.values()
    }

    /// Items eligible for review at `now`, soonest first.
    pub fn due<Tz: TimeZone>(&self, now: DateTime<Tz>) -> Vec<&ItemProgress> {
        let now = now.with_timezone(&Utc);
        let mut out: Vec<&ItemProgress> = self.items.values().filter(|p| p.due_at <= now).collect();
        out.sort_by(|a, b| a.due_at.cmp(&b.due_at).then_with(|| a.item.cmp(&b.item)));
        out
    }

    /// Earliest due time across all items.
    pub fn next_due_at(&self) -> Option<DateTime<Utc>> {
        self.items.values().map(|p| p.due_at).min()
    }

    pub fn counts_by_phase(&self) -> BTreeMap<Phase, usize> {
        let mut counts = BTreeMap::new();
        for p in self.items.values() {
            *counts.entry(p.schedule.phase).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<ItemProgress> for DueQueue {
    fn from_iter<I: IntoIterator<Item = ItemProgress>>(iter: I) -> Self {
        let mut q = DueQueue::new();
        for p in iter {
            q.upsert(p);
        }
        q
    }
}
