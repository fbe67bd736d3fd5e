//! Single-slot hand-off of the latest reading between the acquisition loop
//! and the HTTP listener.
//!
//! The slot only ever holds the newest sample. The whole state is a small
//! `Copy` value kept in a `Cell` behind an embassy blocking mutex, so every
//! access is a copy in or out inside one short critical section. A reader can
//! never see fields from two different writes, and nobody can hold the lock
//! across an await point.
//!
//! ```rust,ignore
//! static SLOT: SharedSampleSlot<CriticalSectionRawMutex> = SharedSampleSlot::new();
//!
//! // acquisition task
//! SLOT.publish(reading);
//!
//! // listener task
//! let reading = SLOT.reading_or_default();
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::reading::SensorReading;

/// Everything a reader can observe about the slot at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotSnapshot {
    /// Last published reading, `None` until the first successful cycle
    pub reading: Option<SensorReading>,
    /// Set by every publish and never cleared
    pub is_fresh: bool,
    /// Number of publishes so far (wrapping)
    pub sequence: u32,
}

impl SlotSnapshot {
    const EMPTY: Self = Self {
        reading: None,
        is_fresh: false,
        sequence: 0,
    };
}

/// Latest-value store shared by one writer and any number of readers.
pub struct SharedSampleSlot<M: RawMutex> {
    state: Mutex<M, Cell<SlotSnapshot>>,
}

impl<M: RawMutex> SharedSampleSlot<M> {
    /// Create an empty slot. `const` so it can live in a `static`.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(SlotSnapshot::EMPTY)),
        }
    }

    /// Replace the stored reading and mark the slot fresh.
    ///
    /// Only the acquisition loop calls this.
    pub fn publish(&self, reading: SensorReading) {
        self.state.lock(|cell| {
            let previous = cell.get();
            cell.set(SlotSnapshot {
                reading: Some(reading),
                is_fresh: true,
                sequence: previous.sequence.wrapping_add(1),
            });
        });
    }

    /// The most recently published reading, if any.
    pub fn latest(&self) -> Option<SensorReading> {
        self.snapshot().reading
    }

    /// The most recent reading, or [`SensorReading::ZERO`] if none was ever
    /// published. The page does not distinguish the two cases.
    pub fn reading_or_default(&self) -> SensorReading {
        self.latest().unwrap_or(SensorReading::ZERO)
    }

    pub fn is_fresh(&self) -> bool {
        self.snapshot().is_fresh
    }

    /// Read reading, freshness and sequence together.
    pub fn snapshot(&self) -> SlotSnapshot {
        self.state.lock(Cell::get)
    }
}

impl<M: RawMutex> Default for SharedSampleSlot<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
    use std::thread;

    #[test]
    fn test_empty_slot() {
        let slot = SharedSampleSlot::<NoopRawMutex>::new();

        assert_eq!(slot.latest(), None);
        assert!(!slot.is_fresh());
        assert_eq!(slot.snapshot().sequence, 0);
        assert_eq!(slot.reading_or_default(), SensorReading::ZERO);
    }

    #[test]
    fn test_publish_replaces_previous_reading() {
        let slot = SharedSampleSlot::<NoopRawMutex>::new();

        slot.publish(SensorReading::new(400.0, 20.0, 40.0));
        slot.publish(SensorReading::new(410.12, 22.5, 45.3));

        let snapshot = slot.snapshot();
        assert_eq!(snapshot.reading, Some(SensorReading::new(410.12, 22.5, 45.3)));
        assert!(snapshot.is_fresh);
        assert_eq!(snapshot.sequence, 2);
    }

    #[test]
    fn test_reads_do_not_clear_freshness() {
        let slot = SharedSampleSlot::<NoopRawMutex>::new();
        slot.publish(SensorReading::new(500.0, 19.0, 50.0));

        for _ in 0..3 {
            assert_eq!(slot.latest(), Some(SensorReading::new(500.0, 19.0, 50.0)));
        }
        assert!(slot.is_fresh());
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_readings() {
        const WRITES: u32 = 20_000;
        let slot = SharedSampleSlot::<CriticalSectionRawMutex>::new();

        thread::scope(|s| {
            s.spawn(|| {
                for i in 1..=WRITES {
                    let v = i as f32;
                    slot.publish(SensorReading::new(v, v, v));
                }
            });

            for _ in 0..4 {
                s.spawn(|| {
                    let mut last_seen = 0.0_f32;
                    loop {
                        let snapshot = slot.snapshot();
                        if let Some(r) = snapshot.reading {
                            // Every write stores the same value in all three
                            // fields, so a mix would show up as a mismatch.
                            assert_eq!(r.co2_ppm, r.temperature_c);
                            assert_eq!(r.co2_ppm, r.humidity_pct);
                            assert_eq!(r.co2_ppm as u32, snapshot.sequence);
                            // Single writer: values only move forward.
                            assert!(r.co2_ppm >= last_seen);
                            last_seen = r.co2_ppm;
                            if snapshot.sequence == WRITES {
                                break;
                            }
                        }
                    }
                });
            }
        });

        assert_eq!(slot.snapshot().sequence, WRITES);
    }
}
