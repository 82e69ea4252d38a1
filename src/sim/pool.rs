//! Index arena with a free-slot stack
//!
//! Slots are reused after release instead of being freed, so a running show
//! stops allocating once it has reached its working-set size. Storage grows
//! on demand up to `max_capacity`; past that, new requests are dropped and
//! counted rather than disturbing live slots.

use std::ops::{Index, IndexMut};

/// Handle to a slot in a [`Pool`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    index: u32,
}

impl PoolHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// Growable pool of reusable `T` slots.
///
/// Released slots keep their old contents until the next `acquire`
/// overwrites them, so callers must fully initialize the value they pass in.
///
/// Not thread-safe; the simulation owns its pools on a single thread.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<T>,
    live: Vec<bool>,
    free: Vec<u32>,
    live_count: usize,
    max_capacity: usize,
    dropped: u64,
}

impl<T> Pool<T> {
    /// Create an empty pool that will grow to at most `max_capacity` slots
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            live: Vec::new(),
            free: Vec::new(),
            live_count: 0,
            max_capacity,
            dropped: 0,
        }
    }

    /// Store `value` in a free slot, growing storage if none is free.
    ///
    /// Returns `None` (and counts a drop) when the pool is at capacity.
    pub fn acquire(&mut self, value: T) -> Option<PoolHandle> {
        let index = if let Some(index) = self.free.pop() {
            self.slots[index as usize] = value;
            self.live[index as usize] = true;
            index
        } else if self.slots.len() < self.max_capacity {
            self.slots.push(value);
            self.live.push(true);
            (self.slots.len() - 1) as u32
        } else {
            self.dropped += 1;
            log::trace!("Pool at capacity ({}), dropping spawn", self.max_capacity);
            return None;
        };

        self.live_count += 1;
        Some(PoolHandle { index })
    }

    /// Return a slot to the free stack.
    ///
    /// Returns false if the handle was already released.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        let index = handle.index();
        match self.live.get_mut(index) {
            Some(live) if *live => {
                *live = false;
                self.free.push(handle.index);
                self.live_count -= 1;
                true
            }
            _ => {
                log::warn!("Released pool slot {index} that was not live");
                false
            }
        }
    }

    #[inline]
    pub fn is_live(&self, handle: PoolHandle) -> bool {
        self.live.get(handle.index()).copied().unwrap_or(false)
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        if self.is_live(handle) {
            self.slots.get(handle.index())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        if self.is_live(handle) {
            self.slots.get_mut(handle.index())
        } else {
            None
        }
    }

    /// Number of live values
    #[inline]
    pub fn len(&self) -> usize {
        self.live_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Slots allocated so far (live + free)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Change the growth limit. Existing slots are kept even above the limit.
    pub fn set_max_capacity(&mut self, max_capacity: usize) {
        self.max_capacity = max_capacity;
    }

    /// Spawn requests dropped because the pool was full
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Release every live slot
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, live) in self.live.iter_mut().enumerate().rev() {
            *live = false;
            self.free.push(index as u32);
        }
        self.live_count = 0;
    }

    /// Live values in slot order
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots
            .iter()
            .zip(&self.live)
            .enumerate()
            .filter(|(_, (_, live))| **live)
            .map(|(index, (value, _))| (PoolHandle { index: index as u32 }, value))
    }

    /// Live values in slot order, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.slots
            .iter_mut()
            .zip(&self.live)
            .enumerate()
            .filter(|(_, (_, live))| **live)
            .map(|(index, (value, _))| (PoolHandle { index: index as u32 }, value))
    }
}

impl<T> Index<PoolHandle> for Pool<T> {
    type Output = T;

    #[inline]
    fn index(&self, handle: PoolHandle) -> &T {
        debug_assert!(self.is_live(handle), "stale pool handle {handle:?}");
        &self.slots[handle.index()]
    }
}

impl<T> IndexMut<PoolHandle> for Pool<T> {
    #[inline]
    fn index_mut(&mut self, handle: PoolHandle) -> &mut T {
        debug_assert!(self.is_live(handle), "stale pool handle {handle:?}");
        &mut self.slots[handle.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pool_acquire_release() {
        let mut pool: Pool<u32> = Pool::with_max_capacity(10);

        let h1 = pool.acquire(42).unwrap();
        assert_eq!(pool[h1], 42);
        assert_eq!(pool.len(), 1);

        assert!(pool.release(h1));
        assert_eq!(pool.len(), 0);
        assert!(pool.get(h1).is_none());
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_pool_reuses_released_slots() {
        let mut pool: Pool<u32> = Pool::with_max_capacity(10);
        let h1 = pool.acquire(1).unwrap();
        pool.release(h1);
        let h2 = pool.acquire(2).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool[h2], 2);
    }

    #[test]
    fn test_pool_double_release_rejected() {
        let mut pool: Pool<u32> = Pool::with_max_capacity(4);
        let h = pool.acquire(7).unwrap();
        assert!(pool.release(h));
        assert!(!pool.release(h));
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_pool_exhaustion_drops_newest() {
        let mut pool: Pool<u32> = Pool::with_max_capacity(2);
        let a = pool.acquire(1).unwrap();
        let b = pool.acquire(2).unwrap();
        assert!(pool.acquire(3).is_none());
        assert_eq!(pool.dropped(), 1);
        // Existing values are untouched
        assert_eq!(pool[a], 1);
        assert_eq!(pool[b], 2);
    }

    #[test]
    fn test_pool_clear() {
        let mut pool: Pool<u32> = Pool::with_max_capacity(8);
        for i in 0..5 {
            pool.acquire(i);
        }
        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.free_count(), 5);
        assert_eq!(pool.iter().count(), 0);
    }

    #[test]
    fn test_pool_iter_skips_free_slots() {
        let mut pool: Pool<u32> = Pool::with_max_capacity(8);
        let handles: Vec<_> = (0..4).map(|i| pool.acquire(i).unwrap()).collect();
        pool.release(handles[1]);
        let values: Vec<u32> = pool.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 2, 3]);
        for (_, v) in pool.iter_mut() {
            *v += 10;
        }
        assert_eq!(pool[handles[3]], 13);
    }

    proptest! {
        #[test]
        fn prop_live_count_matches_operations(ops in prop::collection::vec(any::<bool>(), 0..200)) {
            let mut pool: Pool<usize> = Pool::with_max_capacity(32);
            let mut held = Vec::new();
            for (i, acquire) in ops.into_iter().enumerate() {
                if acquire {
                    if let Some(h) = pool.acquire(i) {
                        held.push(h);
                    }
                } else if let Some(h) = held.pop() {
                    prop_assert!(pool.release(h));
                }
                prop_assert_eq!(pool.len(), held.len());
                prop_assert!(pool.capacity() <= 32);
                prop_assert_eq!(pool.len() + pool.free_count(), pool.capacity());
            }
        }
    }
}
