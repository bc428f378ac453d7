use ash::vk;
use ember_gfx::handle::*;

use crate::records::{DeviceChild, VulkanDevice, device_child};

/// 正在录制的 command buffer
///
/// finish 之后 command buffer 的所有权转交给 [`VulkanCommandBuffer`]，
/// recorder 销毁时不再释放它。
pub struct VulkanCommandRecorder {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub command_pool: vk::CommandPool,
    pub command_buffer: vk::CommandBuffer,
    pub finished: bool,
}

impl DeviceChild for VulkanCommandRecorder {
    fn destroy(self, device: &VulkanDevice) {
        if !self.finished {
            unsafe { device.device.free_command_buffers(self.command_pool, &[self.command_buffer]) };
        }
    }
}

pub struct VulkanCommandBuffer {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub command_pool: vk::CommandPool,
    pub command_buffer: vk::CommandBuffer,
}

impl DeviceChild for VulkanCommandBuffer {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.free_command_buffers(self.command_pool, &[self.command_buffer]) };
    }
}

pub struct VulkanFence {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub fence: vk::Fence,
}

impl DeviceChild for VulkanFence {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_fence(self.fence, None) };
    }
}

pub struct VulkanGpuSemaphore {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub semaphore: vk::Semaphore,
}

impl DeviceChild for VulkanGpuSemaphore {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_semaphore(self.semaphore, None) };
    }
}

/// 绑定在某个 recorder 上的 timestamp query pool
///
/// `written` 是下一个要写入的槽位，写满之后一直覆盖最后一个槽位。
pub struct VulkanTimestampQueryRecorder {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub recorder: CommandRecorderHandle,
    pub query_pool: vk::QueryPool,
    pub query_count: u32,
    pub written: u32,
}

impl DeviceChild for VulkanTimestampQueryRecorder {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_query_pool(self.query_pool, None) };
    }
}

device_child!(
    VulkanCommandRecorder,
    VulkanCommandBuffer,
    VulkanFence,
    VulkanGpuSemaphore,
    VulkanTimestampQueryRecorder
);
