use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::types::{AdapterDeviceType, QueueFlags};

#[derive(Clone, Debug)]
pub struct InstanceOptions {
    pub application_name: String,
    pub application_version: u32,
    /// 额外开启的 layer，validation layer 由 `enable_validation` 控制
    pub layers: Vec<String>,
    pub extensions: Vec<String>,
    /// 环境变量 `EMBER_VALIDATION=0/1` 会覆盖这个值
    pub enable_validation: bool,
    /// 需要创建 surface 时提供，后端据此开启对应的 surface 扩展
    pub display_handle: Option<RawDisplayHandle>,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            application_name: "Ember Application".to_string(),
            application_version: 1,
            layers: vec![],
            extensions: vec![],
            enable_validation: cfg!(debug_assertions),
            display_handle: None,
        }
    }
}

impl InstanceOptions {
    /// 应用环境变量 `EMBER_VALIDATION` 之后，是否开启 validation
    pub fn validation_enabled(&self) -> bool {
        match std::env::var("EMBER_VALIDATION").as_deref() {
            Ok("0") => false,
            Ok("1") => true,
            _ => self.enable_validation,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdapterProperties {
    pub api_version: u32,
    pub driver_version: u32,
    pub vendor_id: u32,
    pub device_id: u32,
    pub device_type: AdapterDeviceType,
    pub device_name: String,
}

/// 设备能力中被资源层关心的那一部分
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdapterFeatures {
    pub buffer_device_address: bool,
    pub sampler_ycbcr_conversion: bool,
    pub acceleration_structures: bool,
    /// 开启时隐含 `acceleration_structures`
    pub ray_tracing_pipeline: bool,
}

/// 一个 queue family 的描述
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdapterQueueType {
    pub flags: QueueFlags,
    pub queue_count: u32,
    pub timestamp_valid_bits: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct SurfaceOptions {
    pub display_handle: RawDisplayHandle,
    pub window_handle: RawWindowHandle,
}
