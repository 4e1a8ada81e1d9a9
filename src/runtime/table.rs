//! Bounded, concurrent (api, caller) profile table
//!
//! Keys are hashed with FNV and spread over cache-padded shards. A hit on an
//! existing entry takes the shard's read lock and bumps atomic counters; only
//! creating an entry takes the shard's write lock. Capacity is reserved from
//! a table-wide atomic sequence, and the reserved sequence number is the
//! entry's insertion position.
//!
//! ```text
//! log_call(api, caller)
//!   ├─ truncate names to the buffer bound
//!   ├─ shard = fnv(api, caller) % SHARD_COUNT
//!   ├─ read lock:  found → count += 1, last_call = max(last_call, now)
//!   └─ write lock: found → same as above (lost a creation race)
//!                  seq < capacity → insert (count = 1, first = last = now)
//!                  otherwise      → dropped += 1
//! ```

use super::entry::{truncate_name, EntrySnapshot, ProfileEntry, MAX_NAME_LEN};
use crossbeam::utils::CachePadded;
use fnv::{FnvHashMap, FnvHasher};
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Instant;

/// Default number of distinct (api, caller) keys
pub const DEFAULT_CAPACITY: usize = 1024;

/// Number of lock shards
pub const SHARD_COUNT: usize = 16;

/// Entries sharing a key hash
type Bucket = Vec<ProfileEntry>;
type Shard = CachePadded<RwLock<FnvHashMap<u64, Bucket>>>;

/// What a single [`ProfileTable::log_call`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    /// Existing entry updated
    Updated,
    /// New entry created
    Created,
    /// Table full; observation discarded
    Dropped,
}

/// Process-wide statistics table for instrumented call sites
pub struct ProfileTable {
    shards: Box<[Shard]>,
    capacity: usize,
    max_name_len: usize,
    next_seq: AtomicUsize,
    dropped: AtomicU64,
    epoch: Instant,
}

impl std::fmt::Debug for ProfileTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileTable")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn key_hash(api_name: &str, caller_name: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(api_name.as_bytes());
    // separator keeps ("ab", "c") and ("a", "bc") apart
    hasher.write_u8(0xff);
    hasher.write(caller_name.as_bytes());
    hasher.finish()
}

impl ProfileTable {
    /// Create a table holding at most `capacity` distinct keys
    pub fn new(capacity: usize) -> Self {
        Self::with_name_limit(capacity, MAX_NAME_LEN)
    }

    /// Create a table with a custom name buffer size (terminator included)
    pub fn with_name_limit(capacity: usize, max_name_len: usize) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| CachePadded::new(RwLock::new(FnvHashMap::default())))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            capacity,
            max_name_len,
            next_seq: AtomicUsize::new(0),
            dropped: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    fn now_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn find<'a>(
        shard: &'a FnvHashMap<u64, Bucket>,
        hash: u64,
        api_name: &str,
        caller_name: &str,
    ) -> Option<&'a ProfileEntry> {
        shard
            .get(&hash)?
            .iter()
            .find(|entry| entry.matches(api_name, caller_name))
    }

    /// Record one call of `api_name` from `caller_name`
    ///
    /// Never fails: when the table is full and the key is new, the
    /// observation is counted in [`dropped`](Self::dropped) and discarded.
    pub fn log_call(&self, api_name: &str, caller_name: &str) -> LogOutcome {
        let api_name = truncate_name(api_name, self.max_name_len);
        let caller_name = truncate_name(caller_name, self.max_name_len);
        let hash = key_hash(api_name, caller_name);
        let shard = &self.shards[(hash as usize) % self.shards.len()];

        {
            let guard = shard.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = Self::find(&guard, hash, api_name, caller_name) {
                entry.record(self.now_ns());
                return LogOutcome::Updated;
            }
        }

        let mut guard = shard.write().unwrap_or_else(PoisonError::into_inner);
        let now = self.now_ns();
        if let Some(entry) = Self::find(&guard, hash, api_name, caller_name) {
            entry.record(now);
            return LogOutcome::Updated;
        }

        let reserved = self
            .next_seq
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |seq| {
                (seq < self.capacity).then_some(seq + 1)
            });

        match reserved {
            Ok(seq) => {
                guard
                    .entry(hash)
                    .or_default()
                    .push(ProfileEntry::new(api_name, caller_name, seq, now));
                LogOutcome::Created
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                LogOutcome::Dropped
            }
        }
    }

    /// Maximum number of distinct keys
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of distinct keys recorded
    ///
    /// Counted from the shards, so an entry whose slot is reserved but not
    /// yet inserted is not included and `len()` never exceeds a later
    /// `snapshot().len()`.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                let guard = shard.read().unwrap_or_else(PoisonError::into_inner);
                guard.values().map(Vec::len).sum::<usize>()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observations discarded because the table was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Count for one key, if recorded
    pub fn count(&self, api_name: &str, caller_name: &str) -> Option<u64> {
        let api_name = truncate_name(api_name, self.max_name_len);
        let caller_name = truncate_name(caller_name, self.max_name_len);
        let hash = key_hash(api_name, caller_name);
        let shard = &self.shards[(hash as usize) % self.shards.len()];
        let guard = shard.read().unwrap_or_else(PoisonError::into_inner);
        Self::find(&guard, hash, api_name, caller_name).map(ProfileEntry::count)
    }

    /// Sum of all entry counts
    pub fn total_calls(&self) -> u64 {
        self.snapshot().iter().map(|entry| entry.count).sum()
    }

    /// Copy of every entry, in insertion order
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        let mut entries: Vec<(usize, EntrySnapshot)> = Vec::with_capacity(self.len());
        for shard in self.shards.iter() {
            let guard = shard.read().unwrap_or_else(PoisonError::into_inner);
            entries.extend(
                guard
                    .values()
                    .flatten()
                    .map(|entry| (entry.seq(), entry.snapshot())),
            );
        }
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, snapshot)| snapshot).collect()
    }
}
