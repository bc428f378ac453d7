use crate::{
    handle::{FenceHandle, GpuSemaphoreHandle, kind},
    owner::ResourceOwner,
    resources::Texture,
    types::AcquireImageResult,
};

/// 交换链，持有它的所有图像对应的 [`Texture`]
#[derive(Debug, Default)]
pub struct Swapchain {
    // 纹理先于 swapchain 释放
    textures: Vec<Texture>,
    inner: ResourceOwner<kind::Swapchain>,
}

gpu_resource!(Swapchain => Swapchain);

// new & init
impl Swapchain {
    pub(crate) fn new(inner: ResourceOwner<kind::Swapchain>) -> Self {
        let texture_handles = inner.read(|rm, swapchain| rm.swapchain_textures(swapchain)).unwrap_or_default();
        let textures = texture_handles
            .into_iter()
            .map(|texture| Texture::new(inner.adopt(inner.device(), texture)))
            .collect();

        Self { textures, inner }
    }
}

// getters
impl Swapchain {
    #[inline]
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }
}

// tools
impl Swapchain {
    pub fn acquire_next_image(
        &self,
        semaphore: Option<GpuSemaphoreHandle>,
        fence: Option<FenceHandle>,
    ) -> AcquireImageResult {
        self.inner
            .write(|rm, swapchain| rm.acquire_next_image(swapchain, semaphore, fence))
            .unwrap_or(AcquireImageResult::Error)
    }
}

impl PartialEq for Swapchain {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}
