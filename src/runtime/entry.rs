//! Profile entries and bounded name handling

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Size of the name buffers, terminator included
pub const MAX_NAME_LEN: usize = 256;

/// Truncate `name` to fit a `max_len`-byte buffer including its terminator
///
/// Cuts on a UTF-8 character boundary, so the result may be a few bytes
/// shorter than `max_len - 1` for multi-byte names. Two long names that share
/// the truncated prefix collapse onto the same key.
pub fn truncate_name(name: &str, max_len: usize) -> &str {
    let limit = max_len.saturating_sub(1);
    if name.len() <= limit {
        return name;
    }
    let mut end = limit;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// One (api, caller) record inside the profile table
///
/// Counters are atomics so hits on an existing entry only need shared
/// access to the shard holding it.
#[derive(Debug)]
pub struct ProfileEntry {
    api_name: Box<str>,
    caller_name: Box<str>,
    /// Creation order across the whole table
    seq: usize,
    count: AtomicU64,
    first_call_ns: u64,
    last_call_ns: AtomicU64,
}

impl ProfileEntry {
    /// New entry for its first observed call at `now_ns`
    ///
    /// `last_call` starts equal to `first_call`, so a single-call entry has a
    /// zero duration.
    pub(crate) fn new(api_name: &str, caller_name: &str, seq: usize, now_ns: u64) -> Self {
        Self {
            api_name: api_name.into(),
            caller_name: caller_name.into(),
            seq,
            count: AtomicU64::new(1),
            first_call_ns: now_ns,
            last_call_ns: AtomicU64::new(now_ns),
        }
    }

    pub(crate) fn matches(&self, api_name: &str, caller_name: &str) -> bool {
        &*self.api_name == api_name && &*self.caller_name == caller_name
    }

    /// Record one more call at `now_ns`
    ///
    /// `last_call` only moves forward even when two threads race with
    /// out-of-order timestamps.
    pub(crate) fn record(&self, now_ns: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.last_call_ns.fetch_max(now_ns, Ordering::Relaxed);
    }

    pub(crate) fn seq(&self) -> usize {
        self.seq
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            api_name: self.api_name.to_string(),
            caller_name: self.caller_name.to_string(),
            count: self.count(),
            first_call: Duration::from_nanos(self.first_call_ns),
            last_call: Duration::from_nanos(self.last_call_ns.load(Ordering::Relaxed)),
        }
    }
}

/// Point-in-time copy of a [`ProfileEntry`]
///
/// Timestamps are offsets from the owning table's creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub api_name: String,
    pub caller_name: String,
    pub count: u64,
    pub first_call: Duration,
    pub last_call: Duration,
}

impl EntrySnapshot {
    /// Time between first and last observed call
    pub fn duration(&self) -> Duration {
        self.last_call.saturating_sub(self.first_call)
    }
}
