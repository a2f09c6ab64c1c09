//! Road collection: de-duplication and query caching.
//!
//! Roads are requested once per selected boundary. Neighbouring regions share
//! border roads, so the per-target results overlap and are merged by
//! [`dedupe`]. Whole query results are memoized in a [`RoadQueryCache`] keyed
//! by a canonical [`RoadQuerySignature`].

mod cache;
mod dedupe;

pub use cache::{Clock, ManualClock, RoadCacheStats, RoadQueryCache, RoadQuerySignature, SystemClock};
pub use dedupe::{dedupe, RawRoadWay};

use serde::{Deserialize, Serialize};

/// Which road classes to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoadFetchOptions {
    pub federal: bool,
    pub regional: bool,
}

impl RoadFetchOptions {
    pub const fn new(federal: bool, regional: bool) -> Self {
        Self { federal, regional }
    }

    /// True when no class is requested; no query should be issued.
    pub fn is_empty(&self) -> bool {
        !self.federal && !self.regional
    }
}
