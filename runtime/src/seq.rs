use std::sync::atomic::{
    AtomicU16,
    Ordering,
};

/// Source of outbound message serial numbers.
///
/// Shared by every connection, so implementations must be safe to call concurrently.
pub trait SerialSource: Send + Sync {
    fn next(&self) -> u16;
}

/// Process-wide counter: 1, 2, ..., 65535, 1, ... Zero is never handed out.
#[derive(Debug, Default)]
pub struct AtomicSerial(AtomicU16);

impl AtomicSerial {
    /// The first call to [`SerialSource::next`] returns the serial after `last`.
    pub const fn after(last: u16) -> Self {
        Self(AtomicU16::new(last))
    }
}

#[inline]
fn successor(n: u16) -> u16 {
    match n.wrapping_add(1) {
        0 => 1,
        n => n,
    }
}

impl SerialSource for AtomicSerial {
    fn next(&self) -> u16 {
        let mut old = self.0.load(Ordering::Acquire);

        loop {
            let new = successor(old);

            match self.0.compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return new,
                Err(x) => old = x,
            }
        }
    }
}
