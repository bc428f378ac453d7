//! 代际资源池
//!
//! 每种资源在资源管理器里都有一个 [`Pool`]。槽位被释放时 generation 自增，
//! 旧句柄因此无法再解引用，这是整个资源层唯一的 use-after-free 防线。

use std::marker::PhantomData;

use crate::handle::{Handle, ResourceKind};

struct Slot<T> {
    value: Option<T>,
    /// 0 表示该槽位从未被使用过
    generation: u32,
    /// generation 已经耗尽，永久弃用
    retired: bool,
}

/// 代际资源池：O(1) 的插入、查找与删除
pub struct Pool<T, K> {
    slots: Vec<Slot<T>>,
    free_indices: Vec<u32>,
    capacity: usize,
    len: usize,
    retired: usize,

    _marker: PhantomData<fn() -> K>,
}

// new & init
impl<T, K: ResourceKind> Pool<T, K> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// 按 [`ResourceType::default_pool_capacity`](crate::handle::ResourceType::default_pool_capacity) 预留槽位
    pub fn with_default_capacity() -> Self {
        Self::with_capacity(K::TYPE.default_pool_capacity())
    }

    /// 预留 `capacity` 个槽位，不分配任何句柄
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_indices: Vec::with_capacity(capacity),
            capacity,
            len: 0,
            retired: 0,
            _marker: PhantomData,
        }
    }
}

impl<T, K: ResourceKind> Default for Pool<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

// getters
impl<T, K: ResourceKind> Pool<T, K> {
    /// 容量的高水位，删除不会让它变小
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 存活的资源数量
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// generation 耗尽而被永久弃用的槽位数量
    #[inline]
    pub fn retired_count(&self) -> usize {
        self.retired
    }

    #[inline]
    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&T> {
        self.slot(handle).and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if !handle.is_valid() || slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// 把槽位下标转换为当前存活的句柄，槽位为空时返回无效句柄
    pub fn handle_for_index(&self, index: u32) -> Handle<K> {
        match self.slots.get(index as usize) {
            Some(slot) if slot.value.is_some() => Handle::new(index, slot.generation),
            _ => Handle::default(),
        }
    }

    /// 按下标顺序遍历所有存活的资源
    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }

    /// 所有存活资源的句柄
    pub fn handles(&self) -> Vec<Handle<K>> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    fn slot(&self, handle: Handle<K>) -> Option<&Slot<T>> {
        let slot = self.slots.get(handle.index() as usize)?;
        (handle.is_valid() && slot.generation == handle.generation() && slot.value.is_some()).then_some(slot)
    }
}

// tools
impl<T, K: ResourceKind> Pool<T, K> {
    /// 存入一个资源并返回它的句柄
    ///
    /// 优先复用空闲槽位，复用时沿用该槽位在删除时已经自增过的 generation；
    /// 新槽位的 generation 从 1 开始。
    pub fn insert(&mut self, value: T) -> Handle<K> {
        if self.free_indices.is_empty() && self.slots.len() >= self.capacity {
            self.grow_capacity();
        }

        if let Some(index) = self.free_indices.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none() && !slot.retired);
            slot.value = Some(value);
            self.len += 1;
            return Handle::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            value: Some(value),
            generation: 1,
            retired: false,
        });
        self.len += 1;
        Handle::new(index, 1)
    }

    /// 取出资源并使所有指向它的句柄失效；句柄已经失效时什么都不做
    pub fn remove(&mut self, handle: Handle<K>) -> Option<T> {
        self.slot(handle)?;
        let index = handle.index();
        let slot = &mut self.slots[index as usize];
        let value = slot.value.take();
        self.len -= 1;

        if slot.generation == u32::MAX {
            slot.retired = true;
            self.retired += 1;
            log::error!(
                "{:?} pool slot {} exhausted its generations and is retired permanently",
                K::TYPE,
                index
            );
        } else {
            slot.generation += 1;
            self.free_indices.push(index);
        }

        value
    }

    /// 删除所有资源，所有句柄都会失效，容量保持不变
    pub fn clear(&mut self) {
        drop(self.drain());
    }

    /// 删除并按下标顺序返回所有资源
    pub fn drain(&mut self) -> Vec<(Handle<K>, T)> {
        let handles = self.handles();
        handles
            .into_iter()
            .filter_map(|handle| self.remove(handle).map(|value| (handle, value)))
            .collect()
    }

    fn grow_capacity(&mut self) {
        let new_capacity = (self.capacity * 2).max(1);
        assert!(new_capacity < u32::MAX as usize, "{:?} pool exceeds the addressable slot count", K::TYPE);

        log::debug!("{:?} pool grows: {} -> {}", K::TYPE, self.capacity, new_capacity);
        self.slots.reserve(new_capacity.saturating_sub(self.slots.len()));
        self.free_indices.reserve(new_capacity.saturating_sub(self.free_indices.len()));
        self.capacity = new_capacity;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::handle::kind;

    type TestPool = Pool<i32, kind::Buffer>;

    #[test]
    fn test_default_pool_is_empty() {
        let pool = TestPool::new();
        assert_eq!(pool.capacity(), 0);
        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_with_capacity_reserves_without_allocating() {
        let pool = TestPool::with_capacity(10);
        assert_eq!(pool.capacity(), 10);
        assert_eq!(pool.len(), 0);
        assert!(!pool.handle_for_index(0).is_valid());
    }

    #[test]
    fn test_insert_and_get() {
        let mut pool = TestPool::new();
        let a = pool.insert(5);
        assert_eq!((a.index(), a.generation()), (0, 1));
        assert!(a.is_valid());

        let b = pool.insert(7);
        assert_eq!((b.index(), b.generation()), (1, 1));

        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(a), Some(&5));
        assert_eq!(pool.get(b), Some(&7));
    }

    #[test]
    fn test_capacity_doubles() {
        let mut pool = TestPool::new();
        let mut capacities = vec![];
        for i in 0..5 {
            pool.insert(i);
            capacities.push(pool.capacity());
        }
        assert_eq!(capacities, vec![1, 2, 4, 4, 8]);
    }

    #[test]
    fn test_default_capacity_follows_kind() {
        let mut pool = TestPool::with_default_capacity();
        assert_eq!(pool.capacity(), 128);
        assert!(pool.is_empty());

        for i in 0..128 {
            pool.insert(i);
        }
        assert_eq!(pool.capacity(), 128);
        pool.insert(128);
        assert_eq!(pool.capacity(), 256);
        assert_eq!(Pool::<(), kind::Instance>::with_default_capacity().capacity(), 1);
    }

    #[test]
    fn test_growth_keeps_earlier_handles() {
        let mut pool = TestPool::new();
        let handles = (0..100).map(|i| pool.insert(i)).collect::<Vec<_>>();
        assert_eq!(pool.capacity(), 128);

        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(pool.get(*handle), Some(&(i as i32)));
        }
        assert_eq!(handles.iter().collect::<HashSet<_>>().len(), 100);
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut pool = TestPool::new();
        let a = pool.insert(1);
        let b = pool.insert(2);
        pool.remove(a);
        pool.remove(b);
        assert_eq!(pool.insert(3).index(), b.index());
        assert_eq!(pool.insert(4).index(), a.index());
    }

    #[test]
    fn test_remove_keeps_capacity() {
        let mut pool = TestPool::new();
        let handle = pool.insert(5);
        assert_eq!(pool.capacity(), 1);

        assert_eq!(pool.remove(handle), Some(5));
        assert_eq!(pool.get(handle), None);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_remove_only_invalidates_target() {
        let mut pool = TestPool::new();
        let a = pool.insert(5);
        let b = pool.insert(7);

        pool.remove(a);
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.get(b), Some(&7));
    }

    #[test]
    fn test_double_remove_is_noop() {
        let mut pool = TestPool::new();
        let a = pool.insert(1);
        let b = pool.insert(2);
        assert_eq!(pool.remove(a), Some(1));
        assert_eq!(pool.remove(a), None);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(b), Some(&2));
    }

    #[test]
    fn test_reuse_bumps_generation() {
        let mut pool = TestPool::new();
        let _a = pool.insert(5);
        let b = pool.insert(7);
        let _c = pool.insert(9);

        pool.remove(b);
        let replacement = pool.insert(123);
        assert_eq!(replacement.index(), b.index());
        assert!(replacement.generation() > b.generation());
        assert_eq!(pool.get(b), None);
        assert_eq!(pool.get(replacement), Some(&123));
    }

    #[test]
    fn test_stale_and_foreign_handles_rejected() {
        let mut pool = TestPool::new();
        let handle = pool.insert(1);
        assert_eq!(pool.get(Handle::default()), None);
        assert_eq!(pool.get(Handle::new(42, 1)), None);
        assert_eq!(pool.get(Handle::new(handle.index(), handle.generation() + 1)), None);
        assert!(pool.get_mut(Handle::new(handle.index(), 0)).is_none());
    }

    #[test]
    fn test_get_mut() {
        let mut pool = TestPool::new();
        let handle = pool.insert(1);
        *pool.get_mut(handle).unwrap() += 10;
        assert_eq!(pool.get(handle), Some(&11));
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut pool = TestPool::new();
        let handles: Vec<_> = (0..3).map(|i| pool.insert(i)).collect();
        let capacity = pool.capacity();

        pool.clear();
        assert_eq!(pool.capacity(), capacity);
        assert!(pool.is_empty());
        assert!(handles.iter().all(|h| pool.get(*h).is_none()));
    }

    #[test]
    fn test_clear_reuses_slots_with_new_generations() {
        let mut pool = TestPool::new();
        let old: Vec<_> = (0..2).map(|i| pool.insert(i)).collect();
        pool.clear();
        let new: Vec<_> = (0..2).map(|i| pool.insert(i)).collect();

        assert_eq!(pool.capacity(), 2);
        let old_indices: HashSet<_> = old.iter().map(|h| h.index()).collect();
        let new_indices: HashSet<_> = new.iter().map(|h| h.index()).collect();
        assert_eq!(old_indices, new_indices);

        let old_generations: HashSet<_> = old.iter().map(|h| h.generation()).collect();
        assert!(new.iter().all(|h| !old_generations.contains(&h.generation())));
    }

    #[test]
    fn test_handle_for_index() {
        let mut pool = TestPool::new();
        for i in 0..4 {
            assert!(!pool.handle_for_index(i).is_valid());
        }

        let handles: Vec<_> = (0..4).map(|i| pool.insert(i)).collect();
        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(pool.handle_for_index(i as u32), *handle);
            assert!(!pool.handle_for_index(i as u32 + pool.len() as u32).is_valid());
        }

        pool.remove(handles[1]);
        assert!(!pool.handle_for_index(1).is_valid());
    }

    #[test]
    fn test_unique_live_handles() {
        let mut pool = TestPool::new();
        let mut live = vec![];
        for round in 0..8 {
            for i in 0..16 {
                live.push(pool.insert(round * 16 + i));
            }
            // 删掉一半，下一轮复用
            for handle in live.drain(..8) {
                pool.remove(handle);
            }
        }
        let set: HashSet<_> = live.iter().copied().collect();
        assert_eq!(set.len(), live.len());
        assert_eq!(pool.len(), live.len());
    }

    #[test]
    fn test_iter_in_index_order() {
        let mut pool = TestPool::new();
        let a = pool.insert(10);
        let b = pool.insert(20);
        let c = pool.insert(30);
        pool.remove(b);

        let items: Vec<_> = pool.iter().map(|(h, v)| (h, *v)).collect();
        assert_eq!(items, vec![(a, 10), (c, 30)]);
    }

    #[test]
    fn test_drain_returns_values() {
        let mut pool = TestPool::new();
        let a = pool.insert(1);
        let b = pool.insert(2);

        let drained = pool.drain();
        assert_eq!(drained, vec![(a, 1), (b, 2)]);
        assert!(pool.is_empty());
        assert!(!pool.contains(a));
    }

    #[test]
    fn test_values_dropped_on_remove() {
        use std::rc::Rc;

        let tracker = Rc::new(());
        let mut pool: Pool<Rc<()>, kind::Fence> = Pool::new();
        let handle = pool.insert(tracker.clone());
        assert_eq!(Rc::strong_count(&tracker), 2);

        drop(pool.remove(handle));
        assert_eq!(Rc::strong_count(&tracker), 1);

        pool.insert(tracker.clone());
        drop(pool);
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_generation_exhaustion_retires_slot() {
        let mut pool = TestPool::new();
        let handle = pool.insert(1);
        pool.slots[handle.index() as usize].generation = u32::MAX;
        let handle = pool.handle_for_index(handle.index());
        assert_eq!(handle.generation(), u32::MAX);

        assert_eq!(pool.remove(handle), Some(1));
        assert_eq!(pool.retired_count(), 1);
        assert_eq!(pool.get(handle), None);

        // 被弃用的槽位不会再发放出去
        let next = pool.insert(2);
        assert_ne!(next.index(), handle.index());
        assert_eq!(next.generation(), 1);
        assert!(!pool.handle_for_index(handle.index()).is_valid());
    }
}
