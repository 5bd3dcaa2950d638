use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::region::Locator;

/// A reusable slot carrying one unit of work from the dispatcher to a worker.
#[derive(Debug, Default)]
pub struct WorkDescriptor {
    locator: Option<Locator>,
}

impl WorkDescriptor {
    pub fn load(&mut self, locator: Locator) {
        self.locator = Some(locator);
    }

    /// Moves the locator out, leaving the descriptor empty.
    pub fn take(&mut self) -> Option<Locator> {
        self.locator.take()
    }

    pub fn is_empty(&self) -> bool {
        self.locator.is_none()
    }
}

#[derive(Debug)]
struct PoolState {
    free: Vec<WorkDescriptor>,
    in_flight: usize,
    closed: bool,
}

/// A blocking pool holding a fixed number of [`WorkDescriptor`]s.
///
/// The dispatcher blocks in [`acquire`](DescriptorPool::acquire) while every
/// descriptor is out, which caps how many units can be queued ahead of the
/// workers. Free plus in-flight always equals the initial capacity.
///
/// Once [`close`](DescriptorPool::close)d, `acquire` stops handing out
/// descriptors and blocked callers wake up with `None`.
#[derive(Debug)]
pub struct DescriptorPool {
    state: Mutex<PoolState>,
    cv: Condvar,
    capacity: usize,
}

impl DescriptorPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        DescriptorPool {
            state: Mutex::new(PoolState {
                free: (0..capacity).map(|_| WorkDescriptor::default()).collect(),
                in_flight: 0,
                closed: false,
            }),
            cv: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panicking worker cannot leave the counters half-updated, so a
    // poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until a descriptor is free and takes it. Returns `None` once
    /// the pool is closed.
    pub fn acquire(&self) -> Option<WorkDescriptor> {
        let mut guard = self.lock();
        loop {
            if guard.closed {
                return None;
            }
            if let Some(descriptor) = guard.free.pop() {
                guard.in_flight += 1;
                return Some(descriptor);
            }
            guard = self.cv.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Test helper: takes a descriptor if one is free right now.
    #[cfg(test)]
    pub fn try_acquire(&self) -> Option<WorkDescriptor> {
        let mut guard = self.lock();
        let descriptor = guard.free.pop()?;
        guard.in_flight += 1;
        Some(descriptor)
    }

    /// Returns a descriptor to the pool and wakes one waiter.
    pub fn release(&self, mut descriptor: WorkDescriptor) {
        descriptor.take();
        let mut guard = self.lock();
        guard.in_flight = guard.in_flight.saturating_sub(1);
        guard.free.push(descriptor);
        drop(guard);
        self.cv.notify_one();
    }

    /// Wakes every waiter in `acquire`; no descriptor is handed out after
    /// this. Released descriptors are still taken back.
    pub fn close(&self) {
        self.lock().closed = true;
        self.cv.notify_all();
    }

    pub fn free_count(&self) -> usize {
        self.lock().free.len()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Free plus in-flight, read under one lock.
    pub fn circulation(&self) -> usize {
        let guard = self.lock();
        guard.free.len() + guard.in_flight
    }
}
