use crate::{
    handle::QueueHandle,
    options::AdapterFeatures,
    types::QueueFlags,
};

#[derive(Clone, Debug, PartialEq)]
pub struct QueueRequest {
    pub queue_type_index: u32,
    pub count: u32,
    /// 长度不足 `count` 时用 1.0 补齐
    pub priorities: Vec<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct DeviceOptions {
    pub label: Option<String>,
    /// 为空时从第一个支持 graphics 的 queue family 创建一个 queue
    pub queues: Vec<QueueRequest>,
    pub extensions: Vec<String>,
    pub requested_features: AdapterFeatures,
}

/// 设备创建后，每个 queue 的描述
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueDescription {
    pub queue: QueueHandle,
    pub queue_type_index: u32,
    pub index_in_family: u32,
    pub flags: QueueFlags,
    pub timestamp_valid_bits: u32,
}
