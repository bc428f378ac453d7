//! 延迟释放
//!
//! 一帧中不再使用的资源可能仍被 in-flight 的帧引用，不能立刻销毁。
//! [`ResourceDeleter`] 把它们按照帧号放进不同的 bin，等到每个 frame index
//! 都确认过这一帧之后再真正释放。

use std::any::Any;

/// 某一帧中被延迟释放的资源
pub struct FrameBin {
    frame_number: u64,
    /// 每个 frame index 是否还可能引用这个 bin
    frame_references: Vec<bool>,
    resources: Vec<Box<dyn Any>>,
}

impl FrameBin {
    fn new(frame_number: u64, frames_in_flight: usize) -> Self {
        Self {
            frame_number,
            frame_references: vec![true; frames_in_flight],
            resources: vec![],
        }
    }

    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    #[inline]
    pub fn frame_references(&self) -> &[bool] {
        &self.frame_references
    }

    #[inline]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// 按类型取出 bin 中的资源
    pub fn resources_of<T: Any>(&self) -> impl Iterator<Item = &T> {
        self.resources.iter().filter_map(|resource| resource.downcast_ref::<T>())
    }

    #[inline]
    pub fn can_be_destroyed(&self) -> bool {
        self.frame_references.iter().all(|referenced| !referenced)
    }
}

/// 按帧延迟释放前端资源对象
///
/// 任何前端对象（`Buffer`、`Texture`、`BindGroup` ...）都可以交给它，
/// 释放即是 drop 这些对象，由对象自己调用资源管理器完成删除。
pub struct ResourceDeleter {
    frame_number: u64,
    frames_in_flight: usize,
    frame_bins: Vec<FrameBin>,
}

// new & init
impl ResourceDeleter {
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            frame_number: 0,
            frames_in_flight: frames_in_flight.max(1),
            frame_bins: vec![],
        }
    }
}

// getters
impl ResourceDeleter {
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    #[inline]
    pub fn frame_bins(&self) -> &[FrameBin] {
        &self.frame_bins
    }
}

// tools
impl ResourceDeleter {
    /// 帧号单调递增，每一帧开始时调用一次
    pub fn move_to_next_frame(&mut self) {
        self.frame_number += 1;
    }

    /// 把资源放进当前帧的 bin
    pub fn delete_later<T: Any>(&mut self, resource: T) {
        let frame_number = self.frame_number;
        if self.frame_bins.last().is_none_or(|bin| bin.frame_number != frame_number) {
            self.frame_bins.push(FrameBin::new(frame_number, self.frames_in_flight));
        }
        if let Some(bin) = self.frame_bins.last_mut() {
            bin.resources.push(Box::new(resource));
        }
    }

    /// frame index 对应的帧已经在 GPU 上完成：之前帧的 bin 不再被它引用
    ///
    /// 所有 frame index 都不再引用的 bin 会被立即释放。当前帧的 bin 不受影响。
    pub fn deref_frame_index(&mut self, frame_index: usize) {
        let _span = ember_crate_tools::profile_span!("ResourceDeleter::deref_frame_index");
        let current = self.frame_number;

        let mut index = 0;
        while index < self.frame_bins.len() {
            let bin = &mut self.frame_bins[index];
            if bin.frame_number != current {
                if let Some(referenced) = bin.frame_references.get_mut(frame_index) {
                    *referenced = false;
                }
            }
            if bin.can_be_destroyed() {
                let bin = self.frame_bins.remove(index);
                Self::destroy_bin(bin, false);
            } else {
                index += 1;
            }
        }
    }

    /// 立即释放所有 bin，通常在 `Device::wait_until_idle` 之后调用
    pub fn delete_all(&mut self) {
        for bin in std::mem::take(&mut self.frame_bins) {
            Self::destroy_bin(bin, true);
        }
    }

    fn destroy_bin(bin: FrameBin, force: bool) {
        if !force && !bin.can_be_destroyed() {
            log::warn!(
                "Deleting resources scheduled in frame {} which are still potentially referenced",
                bin.frame_number
            );
        }
        log::debug!("release {} resources scheduled in frame {}", bin.resources.len(), bin.frame_number);
        drop(bin);
    }
}

impl Drop for ResourceDeleter {
    fn drop(&mut self) {
        if self.frame_bins.iter().any(|bin| !bin.can_be_destroyed()) {
            log::warn!("ResourceDeleter dropped while some frame bins are still referenced");
        }
        self.delete_all();
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;

    /// drop 时计数，模拟一个前端资源对象
    struct Tracked(Rc<Cell<usize>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    const FRAMES_IN_FLIGHT: usize = 3;

    #[test]
    fn test_new_deleter_has_no_bins() {
        let deleter = ResourceDeleter::new(FRAMES_IN_FLIGHT);
        assert!(deleter.frame_bins().is_empty());
        assert_eq!(deleter.frame_number(), 0);
    }

    #[test]
    fn test_delete_later_goes_to_current_bin() {
        let mut deleter = ResourceDeleter::new(FRAMES_IN_FLIGHT);
        for i in 0..4_u32 {
            deleter.delete_later(i);
        }

        let bins = deleter.frame_bins();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].frame_number(), deleter.frame_number());
        assert_eq!(bins[0].frame_references(), &[true; FRAMES_IN_FLIGHT]);
        assert_eq!(bins[0].resources_of::<u32>().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_one_bin_per_frame() {
        let mut deleter = ResourceDeleter::new(FRAMES_IN_FLIGHT);
        let initial = deleter.frame_number();
        for i in 0..4_u64 {
            deleter.delete_later(i);
            deleter.move_to_next_frame();
        }

        let bins = deleter.frame_bins();
        assert_eq!(bins.len(), 4);
        for (i, bin) in bins.iter().enumerate() {
            assert_eq!(bin.frame_number(), initial + i as u64);
            assert_eq!(bin.resource_count(), 1);
        }
    }

    #[test]
    fn test_current_frame_bin_survives_deref() {
        let dropped = Rc::new(Cell::new(0));
        let mut deleter = ResourceDeleter::new(FRAMES_IN_FLIGHT);
        deleter.delete_later(Tracked(dropped.clone()));
        deleter.delete_later(Tracked(dropped.clone()));

        for i in 0..FRAMES_IN_FLIGHT {
            deleter.deref_frame_index(i);
            assert_eq!(deleter.frame_bins().len(), 1);
        }
        assert_eq!(dropped.get(), 0);

        deleter.move_to_next_frame();
        for i in 0..FRAMES_IN_FLIGHT {
            assert_eq!(deleter.frame_bins().len(), 1);
            deleter.deref_frame_index(i);
        }
        assert!(deleter.frame_bins().is_empty());
        assert_eq!(dropped.get(), 2);
    }

    #[test]
    fn test_bins_from_multiple_frames() {
        let dropped = Rc::new(Cell::new(0));
        let mut deleter = ResourceDeleter::new(FRAMES_IN_FLIGHT);
        let frame_count = 3;
        for _ in 0..frame_count {
            deleter.delete_later(Tracked(dropped.clone()));
            deleter.move_to_next_frame();
        }
        assert_eq!(deleter.frame_bins().len(), frame_count);

        for i in 0..FRAMES_IN_FLIGHT - 1 {
            deleter.deref_frame_index(i);
            assert_eq!(deleter.frame_bins().len(), frame_count);
        }
        deleter.deref_frame_index(FRAMES_IN_FLIGHT - 1);
        assert!(deleter.frame_bins().is_empty());
        assert_eq!(dropped.get(), frame_count);
    }

    #[test]
    fn test_delete_all_and_drop_release_everything() {
        let dropped = Rc::new(Cell::new(0));
        let mut deleter = ResourceDeleter::new(2);
        deleter.delete_later(Tracked(dropped.clone()));
        deleter.move_to_next_frame();
        deleter.delete_later(Tracked(dropped.clone()));

        deleter.delete_all();
        assert_eq!(dropped.get(), 2);
        assert!(deleter.frame_bins().is_empty());

        deleter.delete_later(Tracked(dropped.clone()));
        drop(deleter);
        assert_eq!(dropped.get(), 3);
    }
}
