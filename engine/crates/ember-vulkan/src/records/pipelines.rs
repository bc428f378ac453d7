use ash::vk;
use ember_gfx::handle::*;

use crate::records::{DeviceChild, VulkanDevice, device_child};

pub struct VulkanShaderModule {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub shader_module: vk::ShaderModule,
}

impl DeviceChild for VulkanShaderModule {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_shader_module(self.shader_module, None) };
    }
}

pub struct VulkanPipelineLayout {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub pipeline_layout: vk::PipelineLayout,
}

impl DeviceChild for VulkanPipelineLayout {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_pipeline_layout(self.pipeline_layout, None) };
    }
}

pub struct VulkanGraphicsPipeline {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub pipeline: vk::Pipeline,
}

pub struct VulkanComputePipeline {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub pipeline: vk::Pipeline,
}

pub struct VulkanRaytracingPipeline {
    pub device: DeviceHandle,
    pub label: Option<String>,
    pub pipeline: vk::Pipeline,
    pub group_count: u32,
}

impl DeviceChild for VulkanGraphicsPipeline {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_pipeline(self.pipeline, None) };
    }
}

impl DeviceChild for VulkanComputePipeline {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_pipeline(self.pipeline, None) };
    }
}

impl DeviceChild for VulkanRaytracingPipeline {
    fn destroy(self, device: &VulkanDevice) {
        unsafe { device.device.destroy_pipeline(self.pipeline, None) };
    }
}

device_child!(
    VulkanShaderModule,
    VulkanPipelineLayout,
    VulkanGraphicsPipeline,
    VulkanComputePipeline,
    VulkanRaytracingPipeline
);
