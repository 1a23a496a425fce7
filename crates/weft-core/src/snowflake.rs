//! Snowflake ids: 64-bit monotonic identifiers used as envelope sequence
//! numbers.
//!
//! Layout:
//! - Bits 63-22: milliseconds since the weft epoch
//! - Bits 21-12: worker id (0-1023)
//! - Bits 11-0:  per-millisecond sequence (0-4095)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A 64-bit snowflake id. Serialized as a plain integer on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Snowflake(i64);

impl Snowflake {
    /// Custom epoch: 2024-01-01 00:00:00 UTC, in milliseconds.
    pub const EPOCH: i64 = 1_704_067_200_000;

    #[inline]
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Milliseconds since the Unix epoch at which this id was minted.
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        (self.0 >> 22) + Self::EPOCH
    }

    /// Worker id embedded in the id (0-1023).
    #[inline]
    #[must_use]
    pub fn worker_id(&self) -> u16 {
        ((self.0 >> 12) & 0x3FF) as u16
    }

    /// Per-millisecond sequence number (0-4095).
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u16 {
        (self.0 & 0xFFF) as u16
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Snowflake {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for i64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

/// Thread-safe snowflake generator, up to 4096 ids per millisecond per
/// worker, lock-free.
pub struct SnowflakeGenerator {
    worker_id: u16,
    sequence: AtomicI64,
    last_timestamp: AtomicI64,
}

impl SnowflakeGenerator {
    /// # Panics
    /// Panics if `worker_id >= 1024`.
    #[must_use]
    pub fn new(worker_id: u16) -> Self {
        assert!(worker_id < 1024, "worker id must be < 1024");
        Self {
            worker_id,
            sequence: AtomicI64::new(0),
            last_timestamp: AtomicI64::new(0),
        }
    }

    /// Generate the next unique id.
    pub fn generate(&self) -> Snowflake {
        loop {
            let mut timestamp = Self::current_millis();
            let last = self.last_timestamp.load(Ordering::Acquire);

            if timestamp < last {
                // Clock went backwards; wait it out.
                std::thread::sleep(std::time::Duration::from_millis((last - timestamp) as u64));
                timestamp = Self::current_millis();
            }

            let sequence = if timestamp == last {
                let seq = self.sequence.fetch_add(1, Ordering::Relaxed) & 0xFFF;
                if seq == 0 {
                    // Sequence exhausted for this millisecond.
                    while Self::current_millis() <= last {
                        std::hint::spin_loop();
                    }
                    timestamp = Self::current_millis();
                    self.sequence.store(1, Ordering::Relaxed);
                    0
                } else {
                    seq
                }
            } else {
                self.sequence.store(1, Ordering::Relaxed);
                0
            };

            match self.last_timestamp.compare_exchange(
                last,
                timestamp,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    let id = ((timestamp - Snowflake::EPOCH) << 22)
                        | (i64::from(self.worker_id) << 12)
                        | sequence;
                    return Snowflake::new(id);
                }
                Err(_) => continue,
            }
        }
    }

    #[inline]
    fn current_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

impl fmt::Debug for SnowflakeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeGenerator")
            .field("worker_id", &self.worker_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_monotonic() {
        let generator = SnowflakeGenerator::new(1);
        let mut seen = HashSet::new();
        let mut last = Snowflake::default();
        for _ in 0..10_000 {
            let id = generator.generate();
            assert!(id > last, "ids must be strictly increasing");
            assert!(seen.insert(id));
            last = id;
        }
    }

    #[test]
    fn id_components_round_trip() {
        let generator = SnowflakeGenerator::new(42);
        let id = generator.generate();
        assert_eq!(id.worker_id(), 42);
        assert!(id.timestamp() >= Snowflake::EPOCH);
    }

    #[test]
    fn serializes_as_integer() {
        let id = Snowflake::new(123_456);
        assert_eq!(serde_json::to_string(&id).unwrap(), "123456");
        let back: Snowflake = serde_json::from_str("123456").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    #[should_panic(expected = "worker id must be < 1024")]
    fn rejects_out_of_range_worker() {
        let _ = SnowflakeGenerator::new(1024);
    }
}
