use ash::vk;
use ember_gfx::{
    handle::*,
    types::{BufferUsageFlags, Format, MemoryUsage},
};
use vk_mem::Alloc;

use crate::records::{DeviceChild, VulkanDevice, device_child};

pub struct VulkanSwapchain {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub swapchain: vk::SwapchainKHR,
    pub textures: Vec<TextureHandle>,
}

impl DeviceChild for VulkanSwapchain {
    fn destroy(self, device: &VulkanDevice) {
        match &device.swapchain_loader {
            Some(loader) => unsafe { loader.destroy_swapchain(self.swapchain, None) },
            None => log::error!("swapchain {:?} outlived its loader", self.label),
        }
    }
}

pub struct VulkanTexture {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub image: vk::Image,
    pub format: Format,
    /// `None` 表示图像归 swapchain 所有，销毁纹理时不释放图像
    pub allocation: Option<vk_mem::Allocation>,
}

impl DeviceChild for VulkanTexture {
    fn destroy(self, device: &VulkanDevice) {
        if let Some(mut allocation) = self.allocation {
            unsafe { device.allocator.destroy_image(self.image, &mut allocation) };
        }
    }
}

pub struct VulkanTextureView {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub view: vk::ImageView,
}

impl DeviceChild for VulkanTextureView {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_image_view(self.view, None) };
    }
}

pub struct VulkanBuffer {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub buffer: vk::Buffer,
    pub allocation: vk_mem::Allocation,
    pub size: u64,
    pub usage: BufferUsageFlags,
    pub memory_usage: MemoryUsage,
    /// 只有 usage 包含 SHADER_DEVICE_ADDRESS 时才不为 0
    pub device_address: vk::DeviceAddress,
    /// 未配对的 map 次数，销毁前全部 unmap
    pub map_count: u32,
}

impl DeviceChild for VulkanBuffer {
    fn destroy(mut self, device: &VulkanDevice) {
        unsafe {
            for _ in 0..self.map_count {
                device.allocator.unmap_memory(&mut self.allocation);
            }
            device.allocator.destroy_buffer(self.buffer, &mut self.allocation);
        }
    }
}

pub struct VulkanSampler {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub sampler: vk::Sampler,
}

impl DeviceChild for VulkanSampler {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_sampler(self.sampler, None) };
    }
}

pub struct VulkanYcbcrConversion {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub conversion: vk::SamplerYcbcrConversion,
}

impl DeviceChild for VulkanYcbcrConversion {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_sampler_ycbcr_conversion(self.conversion, None) };
    }
}

/// 加速结构及其独占的存储 buffer
pub struct VulkanAccelerationStructure {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub acceleration_structure: vk::AccelerationStructureKHR,
    pub buffer: vk::Buffer,
    pub allocation: vk_mem::Allocation,
}

impl DeviceChild for VulkanAccelerationStructure {
    fn destroy(mut self, device: &VulkanDevice) {
        unsafe {
            match &device.acceleration_structure {
                Some(loader) => loader.destroy_acceleration_structure(self.acceleration_structure, None),
                None => log::error!("acceleration structure {:?} outlived its loader", self.label),
            }
            device.allocator.destroy_buffer(self.buffer, &mut self.allocation);
        }
    }
}

device_child!(
    VulkanSwapchain,
    VulkanTexture,
    VulkanTextureView,
    VulkanBuffer,
    VulkanSampler,
    VulkanYcbcrConversion,
    VulkanAccelerationStructure,
);
