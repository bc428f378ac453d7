use crate::{handle::kind, owner::ResourceOwner, types::FenceStatus};

#[derive(Debug, Default, PartialEq)]
pub struct Fence {
    inner: ResourceOwner<kind::Fence>,
}

gpu_resource!(Fence => Fence);

impl Fence {
    pub(crate) fn new(inner: ResourceOwner<kind::Fence>) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> FenceStatus {
        self.inner.read(|rm, fence| rm.fence_status(fence)).unwrap_or(FenceStatus::Error)
    }

    /// 阻塞直到 fence 被 signal
    pub fn wait(&self) {
        let _span = ember_crate_tools::profile_span!("Fence::wait");
        self.inner.read(|rm, fence| rm.wait_for_fence(fence));
    }

    pub fn reset(&self) {
        self.inner.write(|rm, fence| rm.reset_fence(fence));
    }
}
