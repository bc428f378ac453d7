use std::ptr::NonNull;

use crate::{handle::kind, owner::ResourceOwner};

/// GPU buffer
///
/// 映射、刷新等操作都转发给资源管理器，对象无效时全部是无操作。
#[derive(Debug, Default, PartialEq)]
pub struct Buffer {
    inner: ResourceOwner<kind::Buffer>,
}

gpu_resource!(Buffer => Buffer);

// new & init
impl Buffer {
    pub(crate) fn new(inner: ResourceOwner<kind::Buffer>) -> Self {
        Self { inner }
    }
}

// getters
impl Buffer {
    pub fn size(&self) -> u64 {
        self.inner.read(|rm, buffer| rm.buffer_size(buffer)).unwrap_or(0)
    }

    /// 需要 buffer 带有 `SHADER_DEVICE_ADDRESS` 用途，否则返回 0
    pub fn device_address(&self) -> u64 {
        self.inner.read(|rm, buffer| rm.buffer_device_address(buffer)).unwrap_or(0)
    }
}

// tools
impl Buffer {
    /// 映射到 CPU 地址空间；buffer 不是 host visible 时返回 `None`
    ///
    /// 指针在 [`Buffer::unmap`] 或者 buffer 销毁之前有效。
    pub fn map(&self) -> Option<NonNull<u8>> {
        self.inner.write(|rm, buffer| rm.map_buffer(buffer)).flatten()
    }

    pub fn unmap(&self) {
        self.inner.write(|rm, buffer| rm.unmap_buffer(buffer));
    }

    /// 使 CPU 的写入对 GPU 可见（non-coherent 内存需要）
    pub fn flush(&self) {
        self.inner.write(|rm, buffer| rm.flush_buffer(buffer));
    }

    /// 使 GPU 的写入对 CPU 可见（non-coherent 内存需要）
    pub fn invalidate(&self) {
        self.inner.write(|rm, buffer| rm.invalidate_buffer(buffer));
    }

    /// 映射后把 `data` 写到 `offset` 处，写完 flush 并 unmap
    ///
    /// 越界或者无法映射时返回 false。
    pub fn write(&self, offset: u64, data: &[u8]) -> bool {
        if offset.checked_add(data.len() as u64).is_none_or(|end| end > self.size()) {
            log::error!("buffer write out of range: offset {}, len {}, size {}", offset, data.len(), self.size());
            return false;
        }
        let Some(ptr) = self.map() else {
            return false;
        };
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr().add(offset as usize), data.len());
        }
        self.flush();
        self.unmap();
        true
    }

    /// 映射后把 `offset` 处的 `len` 个字节读出来
    pub fn read(&self, offset: u64, len: usize) -> Option<Vec<u8>> {
        if offset.checked_add(len as u64).is_none_or(|end| end > self.size()) {
            return None;
        }
        let ptr = self.map()?;
        self.invalidate();
        let data = unsafe { std::slice::from_raw_parts(ptr.as_ptr().add(offset as usize), len) }.to_vec();
        self.unmap();
        Some(data)
    }

    /// 写入一组 POD 数据
    pub fn write_slice<T: bytemuck::Pod>(&self, offset: u64, data: &[T]) -> bool {
        self.write(offset, bytemuck::cast_slice(data))
    }
}
