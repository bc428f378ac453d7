use crate::{
    handle::{BufferHandle, CommandBufferHandle, FenceHandle, GpuSemaphoreHandle, QueueHandle, SwapchainHandle},
    types::CommandBufferLevel,
};

#[derive(Clone, Debug, Default)]
pub struct CommandRecorderOptions {
    pub label: Option<String>,
    /// 录制的命令将提交到哪个 queue；`None` 时使用设备的第一个 queue
    pub queue: Option<QueueHandle>,
    pub level: CommandBufferLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferCopy {
    pub src: BufferHandle,
    pub src_offset: u64,
    pub dst: BufferHandle,
    pub dst_offset: u64,
    pub byte_size: u64,
}

#[derive(Clone, Debug, Default)]
pub struct SubmitOptions {
    pub command_buffers: Vec<CommandBufferHandle>,
    pub wait_semaphores: Vec<GpuSemaphoreHandle>,
    pub signal_semaphores: Vec<GpuSemaphoreHandle>,
    pub signal_fence: Option<FenceHandle>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainImageIndex {
    pub swapchain: SwapchainHandle,
    pub image_index: u32,
}

#[derive(Clone, Debug, Default)]
pub struct PresentOptions {
    pub wait_semaphores: Vec<GpuSemaphoreHandle>,
    pub swapchain_images: Vec<SwapchainImageIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct FenceOptions {
    pub label: Option<String>,
    pub create_signalled: bool,
}

#[derive(Clone, Debug, Default)]
pub struct GpuSemaphoreOptions {
    pub label: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TimestampQueryRecorderOptions {
    pub label: Option<String>,
    /// 最多可以写入的时间戳个数
    pub query_count: u32,
}

impl Default for TimestampQueryRecorderOptions {
    fn default() -> Self {
        Self {
            label: None,
            query_count: 32,
        }
    }
}
