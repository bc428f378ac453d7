//! Vulkan 后端存放在资源池中的记录
//!
//! 设备级资源都实现 [`DeviceChild`]，由资源管理器用同一个泛型流程释放。

mod commands;
mod descriptors;
mod foundation;
mod pipelines;
mod resources;

pub use commands::*;
pub use descriptors::*;
pub use foundation::*;
pub use pipelines::*;
pub use resources::*;

use ember_gfx::api::ApiResource;

/// 依附于某个逻辑设备的原生对象
pub trait DeviceChild: ApiResource {
    /// 释放原生对象，调用时所属的设备仍然存活
    fn destroy(self, device: &VulkanDevice);
}

macro_rules! device_child {
    ($($record:ident),* $(,)?) => {
        $(
            impl ember_gfx::api::ApiResource for $record {
                fn device(&self) -> ember_gfx::handle::DeviceHandle {
                    self.device
                }

                fn label(&self) -> Option<&str> {
                    self.label.as_deref()
                }
            }
        )*
    };
}
pub(crate) use device_child;
