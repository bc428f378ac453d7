//! Ember 的 Vulkan 后端
//!
//! 基于 ash 调用 Vulkan，基于 vk-mem 管理显存。每一种资源在
//! [`VulkanResourceManager`] 中都有对应的 record，保存原生句柄与释放它所需的信息。

mod debug_messenger;
mod records;

pub mod resource_manager;
pub mod vulkan_enums;
pub mod vulkan_graphics_api;

pub use resource_manager::VulkanResourceManager;
pub use vulkan_graphics_api::VulkanGraphicsApi;
