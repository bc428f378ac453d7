use ash::vk;
use ember_gfx::{handle::*, options::ResourceBindingLayout};

use crate::records::{DeviceChild, VulkanDevice, device_child};

pub struct VulkanBindGroupLayout {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub layout: vk::DescriptorSetLayout,
    pub bindings: Vec<ResourceBindingLayout>,
}

impl DeviceChild for VulkanBindGroupLayout {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_descriptor_set_layout(self.layout, None) };
    }
}

/// descriptor pool，记录从中分配出去的 bind group
pub struct VulkanBindGroupPool {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub pool: vk::DescriptorPool,
    pub max_bind_group_count: u32,
    pub bind_groups: Vec<BindGroupHandle>,
}

impl DeviceChild for VulkanBindGroupPool {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_descriptor_pool(self.pool, None) };
    }
}

pub struct VulkanBindGroup {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub pool: BindGroupPoolHandle,
    pub descriptor_pool: vk::DescriptorPool,
    pub descriptor_set: vk::DescriptorSet,
    /// 创建时从 layout 复制，layout 先于 bind group 销毁也能继续更新
    pub bindings: Vec<ResourceBindingLayout>,
}

impl DeviceChild for VulkanBindGroup {
    fn destroy(self, device: &VulkanDevice) {
        if let Err(err) = unsafe { device.device.free_descriptor_sets(self.descriptor_pool, &[self.descriptor_set]) } {
            log::error!("failed to free descriptor set of {:?}: {:?}", self.label, err);
        }
    }
}

device_child!(VulkanBindGroupLayout, VulkanBindGroupPool, VulkanBindGroup);
