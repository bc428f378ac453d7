use crate::{handle::kind, owner::ResourceOwner};

/// GPU 与 GPU 之间同步用的二值信号量
#[derive(Debug, Default, PartialEq)]
pub struct GpuSemaphore {
    inner: ResourceOwner<kind::GpuSemaphore>,
}

gpu_resource!(GpuSemaphore => GpuSemaphore);

impl GpuSemaphore {
    pub(crate) fn new(inner: ResourceOwner<kind::GpuSemaphore>) -> Self {
        Self { inner }
    }
}
