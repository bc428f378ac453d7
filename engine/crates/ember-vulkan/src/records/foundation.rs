use std::{collections::HashMap, ffi::CString, mem::ManuallyDrop};

use anyhow::Context;
use ash::vk;
use ember_gfx::{
    api::ApiResource,
    handle::*,
    options::{AdapterFeatures, AdapterProperties, AdapterQueueType, QueueDescription},
};

use crate::debug_messenger::VulkanDebugMessenger;

pub struct VulkanInstance {
    pub application_name: String,
    pub instance: ash::Instance,
    pub surface_loader: ash::khr::surface::Instance,
    pub debug_messenger: Option<VulkanDebugMessenger>,
    /// 开启了 `VK_EXT_debug_utils`，设备可以设置 debug name
    pub debug_utils_enabled: bool,
    /// 开启了 surface 相关扩展
    pub surface_enabled: bool,
    /// 第一次枚举之后缓存下来
    pub adapters: Option<Vec<AdapterHandle>>,
}

impl VulkanInstance {
    pub fn destroy(mut self) {
        log::info!("destroying instance {}", self.application_name);
        if let Some(messenger) = self.debug_messenger.take() {
            messenger.destroy();
        }
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}

pub struct VulkanAdapter {
    pub instance: InstanceHandle,
    pub physical_device: vk::PhysicalDevice,
    pub properties: AdapterProperties,
    pub features: AdapterFeatures,
    pub queue_types: Vec<AdapterQueueType>,
    /// 支持的 device extensions
    pub extensions: Vec<CString>,
    pub limits: AdapterLimits,
}

/// 创建资源时需要的设备限制
#[derive(Clone, Copy, Debug, Default)]
pub struct AdapterLimits {
    /// 每个时间戳 tick 的纳秒数
    pub timestamp_period: f32,
    /// 不支持光追管线时为 0
    pub shader_group_handle_size: u32,
    pub max_ray_recursion_depth: u32,
}

impl VulkanAdapter {
    #[inline]
    pub fn supports_extension(&self, name: &std::ffi::CStr) -> bool {
        self.extensions.iter().any(|ext| ext.as_c_str() == name)
    }
}

pub struct VulkanSurface {
    pub instance: InstanceHandle,
    pub surface: vk::SurfaceKHR,
}

/// 逻辑设备，以及设备级扩展的函数指针与内存分配器
pub struct VulkanDevice {
    pub instance: InstanceHandle,
    pub label: Option<String>,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,
    pub swapchain_loader: Option<ash::khr::swapchain::Device>,
    pub debug_utils: Option<ash::ext::debug_utils::Device>,
    pub acceleration_structure: Option<ash::khr::acceleration_structure::Device>,
    pub ray_tracing_pipeline: Option<ash::khr::ray_tracing_pipeline::Device>,
    /// 必须先于 device 销毁
    pub allocator: ManuallyDrop<vk_mem::Allocator>,
    pub features: AdapterFeatures,
    pub limits: AdapterLimits,
    pub queues: Vec<QueueDescription>,
    /// 没有指定 pool 的 bind group 从这里分配
    pub default_bind_group_pool: BindGroupPoolHandle,
    /// command pool 和 queue family 绑定，按需创建
    pub command_pools: HashMap<u32, vk::CommandPool>,
}

// tools
impl VulkanDevice {
    pub fn set_debug_name<T: vk::Handle>(&self, handle: T, name: Option<&str>) {
        let (Some(debug_utils), Some(name)) = (&self.debug_utils, name) else {
            return;
        };
        let Ok(name) = CString::new(name) else {
            log::warn!("debug name {:?} contains nul", name);
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT::default().object_name(name.as_c_str()).object_handle(handle);
        if let Err(err) = unsafe { debug_utils.set_debug_utils_object_name(&info) } {
            log::warn!("failed to set debug name {:?}: {:?}", name, err);
        }
    }

    /// 取得 queue family 对应的 command pool，没有时创建
    pub fn command_pool(&mut self, queue_family_index: u32) -> anyhow::Result<vk::CommandPool> {
        if let Some(pool) = self.command_pools.get(&queue_family_index) {
            return Ok(*pool);
        }
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe { self.device.create_command_pool(&create_info, None) }
            .with_context(|| format!("Failed to create command pool for queue family {}", queue_family_index))?;
        self.set_debug_name(pool, Some(&format!("CommandPool::family-{}", queue_family_index)));
        self.command_pools.insert(queue_family_index, pool);
        Ok(pool)
    }

    pub fn swapchain_loader(&self) -> anyhow::Result<&ash::khr::swapchain::Device> {
        self.swapchain_loader.as_ref().context("VK_KHR_swapchain is not enabled on this device")
    }

    pub fn ray_tracing_pipeline_loader(&self) -> anyhow::Result<&ash::khr::ray_tracing_pipeline::Device> {
        self.ray_tracing_pipeline.as_ref().context("ray_tracing_pipeline is not enabled on this device")
    }
}

// destroy
impl VulkanDevice {
    /// 所有子资源都已经释放之后调用
    pub fn destroy(mut self) {
        log::info!("destroying device {:?}", self.label);
        unsafe {
            if let Err(err) = self.device.device_wait_idle() {
                log::error!("device_wait_idle failed before destroy: {:?}", err);
            }
            for (_, pool) in self.command_pools.drain() {
                self.device.destroy_command_pool(pool, None);
            }
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);
        }
    }
}

pub struct VulkanQueue {
    pub device: DeviceHandle,
    pub queue: vk::Queue,
    pub queue_family_index: u32,
}

impl ApiResource for VulkanQueue {
    fn device(&self) -> DeviceHandle {
        self.device
    }
}

impl ApiResource for VulkanInstance {
    fn device(&self) -> DeviceHandle {
        DeviceHandle::default()
    }

    fn label(&self) -> Option<&str> {
        Some(&self.application_name)
    }
}

impl ApiResource for VulkanAdapter {
    fn device(&self) -> DeviceHandle {
        DeviceHandle::default()
    }

    fn label(&self) -> Option<&str> {
        Some(&self.properties.device_name)
    }
}

impl ApiResource for VulkanSurface {
    fn device(&self) -> DeviceHandle {
        DeviceHandle::default()
    }
}

impl ApiResource for VulkanDevice {
    fn device(&self) -> DeviceHandle {
        DeviceHandle::default()
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
