// crates/hiex-core/src/time.rs
// ============================================================================
// Module: HIEX Time Model
// Description: Epoch-millisecond timestamps for headers and outcome records.
// Purpose: Provide one canonical wall-clock representation across the SDK.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every protocol header set and every outcome record carries a unix
//! epoch-millisecond timestamp. The wrapper keeps the representation in one
//! place; components that need the current time call [`Timestamp::now`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Unix epoch-millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current wall-clock time.
    ///
    /// A clock set before the unix epoch saturates to zero rather than
    /// failing; outcome records must always carry a timestamp.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
        Self(millis)
    }

    /// Returns the timestamp as epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(&self) -> i64 {
        self.0
    }
}
