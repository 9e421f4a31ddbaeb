//! Prefetch budget limits
//!
//! Count: passes iff `max_count == -1 || count < max_count`.
//! Time: passes iff `max_time_millis <= 0 || now < max_time_millis`.

use super::storing::ProposalPolicy;
use crate::types::TimeMillis;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Limit parameters for one traversal; `-1` (or any negative duration) means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefetchLimits {
    pub max_count: i64,
    pub max_recurse_level: i32,
    pub max_duration_millis: i64,
}

impl PrefetchLimits {
    pub const UNLIMITED: PrefetchLimits = PrefetchLimits {
        max_count: -1,
        max_recurse_level: -1,
        max_duration_millis: -1,
    };

    /// Fetch a single node without recursing
    pub fn single_node() -> Self {
        Self {
            max_count: 1,
            max_recurse_level: 0,
            max_duration_millis: -1,
        }
    }
}

impl Default for PrefetchLimits {
    fn default() -> Self {
        Self::UNLIMITED
    }
}

/// Count budget shared by every context of one traversal
#[derive(Debug)]
pub struct PrefetchCountLimit {
    max_count: i64,
    count: AtomicI64,
}

impl PrefetchCountLimit {
    pub fn new(max_count: i64) -> Self {
        Self {
            max_count,
            count: AtomicI64::new(0),
        }
    }

    pub fn accept(&self) -> bool {
        self.max_count == -1 || self.count.load(Ordering::SeqCst) < self.max_count
    }

    /// Add `count`, saturating at `i64::MAX`
    pub fn incr(&self, count: u64) {
        let delta = i64::try_from(count).unwrap_or(i64::MAX);
        let _ = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(delta))
            });
    }

    pub fn current(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn max_count(&self) -> i64 {
        self.max_count
    }
}

/// Deadline computed once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchTimeLimit {
    max_time_millis: TimeMillis,
}

impl PrefetchTimeLimit {
    /// `outer_ceiling_millis <= 0` means no outer ceiling.
    ///
    /// With a non-negative duration the deadline is
    /// `min(start + max_duration, outer_ceiling)`; otherwise it is the ceiling.
    pub fn new(
        start_millis: TimeMillis,
        max_duration_millis: i64,
        outer_ceiling_millis: TimeMillis,
    ) -> Self {
        let max_time_millis = if max_duration_millis >= 0 {
            let own = start_millis + max_duration_millis;
            if outer_ceiling_millis > 0 {
                own.min(outer_ceiling_millis)
            } else {
                own
            }
        } else {
            outer_ceiling_millis
        };
        Self { max_time_millis }
    }

    pub fn unlimited() -> Self {
        Self { max_time_millis: 0 }
    }

    pub fn accept(&self, now_millis: TimeMillis) -> bool {
        self.max_time_millis <= 0 || now_millis < self.max_time_millis
    }

    pub fn max_time_millis(&self) -> TimeMillis {
        self.max_time_millis
    }
}

fn default_max_count() -> i64 {
    -1
}

fn default_max_recurse_level() -> i32 {
    -1
}

fn default_max_duration_millis() -> i64 {
    -1
}

fn default_max_concurrent_listings() -> usize {
    8
}

/// Prefetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchConfig {
    #[serde(default = "default_max_count")]
    pub max_count: i64,

    #[serde(default = "default_max_recurse_level")]
    pub max_recurse_level: i32,

    #[serde(default = "default_max_duration_millis")]
    pub max_duration_millis: i64,

    /// Concurrent backend calls across one traversal
    #[serde(default = "default_max_concurrent_listings")]
    pub max_concurrent_listings: usize,

    /// What the storing context does with proposed children
    #[serde(default)]
    pub proposal_policy: ProposalPolicy,
}

impl PrefetchConfig {
    pub fn limits(&self) -> PrefetchLimits {
        PrefetchLimits {
            max_count: self.max_count,
            max_recurse_level: self.max_recurse_level,
            max_duration_millis: self.max_duration_millis,
        }
    }
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
            max_recurse_level: default_max_recurse_level(),
            max_duration_millis: default_max_duration_millis(),
            max_concurrent_listings: default_max_concurrent_listings(),
            proposal_policy: ProposalPolicy::default(),
        }
    }
}
