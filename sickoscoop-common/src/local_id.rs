//! Ids for entities created on this device before the backend confirmed them.
//!
//! Layout is a millisecond timestamp since [`LOCAL_EPOCH`] in the upper bits
//! and a wrapping per-generator increment in the lower [`INCREMENT_LENGTH`] bits,
//! so ids from one generator sort by creation time.

use std::fmt::{Display, Formatter};
use time::{UtcDateTime, macros::utc_datetime};

pub const LOCAL_EPOCH: UtcDateTime = utc_datetime!(2025-01-01 00:00);

pub const INCREMENT_LENGTH: u64 = 12;
pub const INCREMENT_BITMASK: u64 = (1 << INCREMENT_LENGTH) - 1;
pub const TIMESTAMP_OFFSET: u64 = INCREMENT_LENGTH;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LocalSnowflake(u64);

impl LocalSnowflake {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner)
    }

    #[must_use]
    pub fn from_parts(timestamp_millis: u64, increment: u16) -> Self {
        Self(timestamp_millis << TIMESTAMP_OFFSET | (u64::from(increment) & INCREMENT_BITMASK))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn timestamp_millis(self) -> u64 {
        self.0 >> TIMESTAMP_OFFSET
    }

    #[must_use]
    pub fn increment(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let increment = (self.0 & INCREMENT_BITMASK) as u16;
        increment
    }
}

impl Display for LocalSnowflake {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct LocalIdGenerator {
    next_increment: u16,
}

impl LocalIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Times before [`LOCAL_EPOCH`] clamp to a zero timestamp.
    pub fn generate_at(&mut self, time: UtcDateTime) -> LocalSnowflake {
        let millis = u64::try_from((time - LOCAL_EPOCH).whole_milliseconds()).unwrap_or(0);

        let increment = self.next_increment;
        self.next_increment = (self.next_increment + 1) % (1 << INCREMENT_LENGTH);

        LocalSnowflake::from_parts(millis, increment)
    }

    pub fn generate(&mut self) -> LocalSnowflake {
        self.generate_at(UtcDateTime::now())
    }
}
