//! # LastValue: single-slot mailbox between generation and dispatch.
//!
//! The cell packs `(epoch: u32, value: f32 bits)` into one [`AtomicU64`], so a
//! reader always sees a value together with the subscription epoch that wrote it.
//! Writers and readers never block each other.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// One observation of the cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub epoch: u32,
    pub value: f32,
}

/// Versioned scalar cell.
#[derive(Debug)]
pub struct LastValue {
    cell: AtomicU64,
    epoch: AtomicU32,
}

#[inline]
fn pack(epoch: u32, value: f32) -> u64 {
    (u64::from(epoch) << 32) | u64::from(value.to_bits())
}

#[inline]
fn unpack(raw: u64) -> Reading {
    Reading {
        epoch: (raw >> 32) as u32,
        value: f32::from_bits(raw as u32),
    }
}

impl LastValue {
    /// Creates a cell holding `initial` in epoch 0.
    pub fn new(initial: f32) -> Self {
        Self {
            cell: AtomicU64::new(pack(0, initial)),
            epoch: AtomicU32::new(0),
        }
    }

    /// Starts a new epoch and returns it. Readings of older epochs become stale.
    ///
    /// The stored value is kept; it just stops being current.
    pub fn begin_epoch(&self) -> u32 {
        self.epoch.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    pub fn current_epoch(&self) -> u32 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Overwrites the cell with a value produced in `epoch`.
    pub fn store(&self, epoch: u32, value: f32) {
        self.cell.store(pack(epoch, value), Ordering::Release);
    }

    pub fn load(&self) -> Reading {
        unpack(self.cell.load(Ordering::Acquire))
    }
}

impl Default for LastValue {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_keeps_epoch_and_value_together() {
        let cell = LastValue::new(1.5);
        assert_eq!(
            cell.load(),
            Reading {
                epoch: 0,
                value: 1.5
            }
        );

        let e = cell.begin_epoch();
        assert_eq!(e, 1);
        assert_eq!(cell.current_epoch(), 1);
        assert_eq!(cell.load().epoch, 0);

        cell.store(e, -3.25);
        assert_eq!(
            cell.load(),
            Reading {
                epoch: 1,
                value: -3.25
            }
        );
    }

    #[test]
    fn stale_store_is_distinguishable() {
        let cell = LastValue::default();
        let old = cell.begin_epoch();
        let new = cell.begin_epoch();

        cell.store(old, 50.0);
        let r = cell.load();
        assert_ne!(r.epoch, cell.current_epoch());

        cell.store(new, 30.0);
        assert_eq!(cell.load().epoch, cell.current_epoch());
    }
}
