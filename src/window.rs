//! Chromosome-aware window of recently admitted variants
//!
//! Records live in a ring arena addressed by a head index and a length. A
//! count-capped window allocates its slots once; unbounded and distance-capped
//! windows double the arena only when it is full.

use crate::variant::VariantRecord;
use std::num::NonZeroUsize;

/// Retention policy for a [`Window`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowPolicy {
    /// Keep every record of the current chromosome
    #[default]
    Unbounded,
    /// Keep at most this many records, the newest included
    MaxCount(NonZeroUsize),
    /// Drop records more than this many bases behind the newest one
    MaxDistance(u64),
}

const INITIAL_SLOTS: usize = 64;

/// Fixed-capacity FIFO arena
struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ring {
            slots,
            head: 0,
            len: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    fn slot(&self, offset: usize) -> usize {
        (self.head + offset) % self.capacity()
    }

    /// Insert at the tail, doubling the arena first when it is full
    fn push_back(&mut self, item: T) {
        if self.is_full() {
            self.grow();
        }
        let slot = self.slot(self.len);
        self.slots[slot] = Some(item);
        self.len += 1;
    }

    fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        item
    }

    fn get(&self, offset: usize) -> Option<&T> {
        if offset >= self.len {
            return None;
        }
        self.slots[self.slot(offset)].as_ref()
    }

    fn front(&self) -> Option<&T> {
        self.get(0)
    }

    fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |offset| self.get(offset))
    }

    fn clear(&mut self) {
        while self.pop_front().is_some() {}
        self.head = 0;
    }

    /// Double the arena, keeping arrival order
    fn grow(&mut self) {
        let capacity = (self.capacity() * 2).max(1);
        let mut grown = Ring::with_capacity(capacity);
        while let Some(item) = self.pop_front() {
            grown.push_back(item);
        }
        *self = grown;
    }
}

/// Records eligible for pairing with the next variant.
///
/// All held records share one chromosome; admitting a record from another
/// chromosome clears the window first.
pub struct Window {
    policy: WindowPolicy,
    ring: Ring<VariantRecord>,
    evicted: usize,
}

impl Window {
    pub fn new(policy: WindowPolicy) -> Self {
        let capacity = match policy {
            WindowPolicy::MaxCount(count) => count.get(),
            WindowPolicy::Unbounded | WindowPolicy::MaxDistance(_) => INITIAL_SLOTS,
        };
        Window {
            policy,
            ring: Ring::with_capacity(capacity),
            evicted: 0,
        }
    }

    /// Chromosome of the held records
    pub fn chrom(&self) -> Option<&str> {
        self.ring.front().map(|record| record.chrom.as_str())
    }

    /// Oldest held record
    pub fn head(&self) -> Option<&VariantRecord> {
        self.ring.front()
    }

    /// Most recently admitted record
    pub fn newest(&self) -> Option<&VariantRecord> {
        self.ring.back()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.len() == 0
    }

    /// Records dropped by the retention policy so far (chromosome clears excluded)
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    /// Whether admitting `record` would clear the window or evict its head
    pub fn would_evict(&self, record: &VariantRecord) -> bool {
        let Some(head) = self.ring.front() else {
            return false;
        };
        if head.chrom != record.chrom {
            return true;
        }
        match self.policy {
            WindowPolicy::Unbounded => false,
            WindowPolicy::MaxCount(count) => self.ring.len() >= count.get(),
            WindowPolicy::MaxDistance(distance) => record.pos.saturating_sub(head.pos) > distance,
        }
    }

    /// Insert `record` at the tail, clearing on a chromosome change and
    /// evicting from the head as the policy requires.
    pub fn admit(&mut self, record: VariantRecord) {
        if self.chrom().is_some_and(|chrom| chrom != record.chrom) {
            self.ring.clear();
        }

        if let WindowPolicy::MaxCount(count) = self.policy {
            while self.ring.len() >= count.get() {
                self.ring.pop_front();
                self.evicted += 1;
            }
        }

        self.ring.push_back(record);

        if let WindowPolicy::MaxDistance(distance) = self.policy {
            let newest = self.ring.back().map_or(0, |record| record.pos);
            while self
                .ring
                .front()
                .is_some_and(|head| newest.saturating_sub(head.pos) > distance)
            {
                self.ring.pop_front();
                self.evicted += 1;
            }
        }
    }

    /// Held records that arrived before `record`, oldest first
    pub fn candidates_for<'a>(
        &'a self,
        record: &'a VariantRecord,
    ) -> impl Iterator<Item = &'a VariantRecord> + 'a {
        self.ring
            .iter()
            .filter(move |held| held.index < record.index && held.chrom == record.chrom)
    }

    /// Every held record, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &VariantRecord> + '_ {
        self.ring.iter()
    }

    /// Remove and return every held record, oldest first
    pub fn drain(&mut self) -> Vec<VariantRecord> {
        let mut records = Vec::with_capacity(self.ring.len());
        while let Some(record) = self.ring.pop_front() {
            records.push(record);
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, chrom: &str, pos: u64) -> VariantRecord {
        VariantRecord {
            index,
            chrom: chrom.to_string(),
            pos,
            id: None,
            ref_allele: "A".to_string(),
            alt: "G".to_string(),
            dosages: vec![Some(0.0), Some(1.0)],
        }
    }

    fn positions(window: &Window) -> Vec<u64> {
        window.iter().map(|r| r.pos).collect()
    }

    #[test]
    fn test_ring_wraps_around() {
        let mut ring = Ring::with_capacity(3);
        for i in 0..3 {
            ring.push_back(i);
        }
        assert!(ring.is_full());
        assert_eq!(ring.pop_front(), Some(0));
        ring.push_back(3);
        assert_eq!(ring.capacity(), 3);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(ring.front(), Some(&1));
        assert_eq!(ring.back(), Some(&3));
    }

    #[test]
    fn test_ring_grows_when_full() {
        let mut ring = Ring::with_capacity(3);
        ring.push_back(0);
        ring.pop_front();
        // Head is mid-arena, so the wrapped order must survive the copy
        for i in 1..=4 {
            ring.push_back(i);
        }
        assert_eq!(ring.capacity(), 6);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_count_cap_evicts_oldest() {
        let mut window = Window::new(WindowPolicy::MaxCount(NonZeroUsize::new(3).unwrap()));
        for (i, pos) in [10, 20, 30, 40, 50].into_iter().enumerate() {
            window.admit(record(i, "chr1", pos));
        }
        assert_eq!(positions(&window), vec![30, 40, 50]);
        assert_eq!(window.evicted(), 2);
        // The arena was sized once for the cap
        assert_eq!(window.ring.capacity(), 3);
    }

    #[test]
    fn test_distance_cap_evicts_far_records() {
        let mut window = Window::new(WindowPolicy::MaxDistance(100));
        window.admit(record(0, "chr1", 100));
        window.admit(record(1, "chr1", 150));
        window.admit(record(2, "chr1", 200));
        assert_eq!(positions(&window), vec![100, 150, 200]);
        window.admit(record(3, "chr1", 251));
        assert_eq!(positions(&window), vec![200, 251]);
    }

    #[test]
    fn test_chromosome_change_clears() {
        let mut window = Window::new(WindowPolicy::Unbounded);
        window.admit(record(0, "chr1", 100));
        window.admit(record(1, "chr1", 200));
        window.admit(record(2, "chr2", 50));
        assert_eq!(window.chrom(), Some("chr2"));
        assert_eq!(window.len(), 1);
        // Chromosome clears are not policy evictions
        assert_eq!(window.evicted(), 0);
    }

    #[test]
    fn test_unbounded_grows() {
        let mut window = Window::new(WindowPolicy::Unbounded);
        for i in 0..200 {
            window.admit(record(i, "chr1", i as u64 + 1));
        }
        assert_eq!(window.len(), 200);
        assert_eq!(window.head().map(|r| r.pos), Some(1));
        assert_eq!(window.newest().map(|r| r.pos), Some(200));
    }

    #[test]
    fn test_candidates_exclude_the_record_itself() {
        let mut window = Window::new(WindowPolicy::Unbounded);
        window.admit(record(0, "chr1", 100));
        window.admit(record(1, "chr1", 200));
        window.admit(record(2, "chr1", 300));
        let newest = window.newest().unwrap();
        let candidates: Vec<usize> = window.candidates_for(newest).map(|r| r.index).collect();
        assert_eq!(candidates, vec![0, 1]);
    }

    #[test]
    fn test_would_evict() {
        let mut window = Window::new(WindowPolicy::MaxCount(NonZeroUsize::new(2).unwrap()));
        assert!(!window.would_evict(&record(0, "chr1", 100)));
        window.admit(record(0, "chr1", 100));
        assert!(!window.would_evict(&record(1, "chr1", 200)));
        assert!(window.would_evict(&record(1, "chr2", 200)));
        window.admit(record(1, "chr1", 200));
        assert!(window.would_evict(&record(2, "chr1", 300)));

        let mut window = Window::new(WindowPolicy::MaxDistance(50));
        window.admit(record(0, "chr1", 100));
        assert!(!window.would_evict(&record(1, "chr1", 150)));
        assert!(window.would_evict(&record(1, "chr1", 151)));
    }

    #[test]
    fn test_drain_returns_arrival_order() {
        let mut window = Window::new(WindowPolicy::MaxCount(NonZeroUsize::new(2).unwrap()));
        window.admit(record(0, "chr1", 1));
        window.admit(record(1, "chr1", 2));
        window.admit(record(2, "chr1", 3));
        let drained: Vec<usize> = window.drain().into_iter().map(|r| r.index).collect();
        assert_eq!(drained, vec![1, 2]);
        assert!(window.is_empty());
    }
}
