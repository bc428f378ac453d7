use crate::{handle::kind, options::TextureViewOptions, owner::ResourceOwner};

/// 纹理；swapchain 的纹理由 [`Swapchain`](crate::swapchain::Swapchain) 持有，销毁时不会释放图像本身
#[derive(Debug, Default, PartialEq)]
pub struct Texture {
    inner: ResourceOwner<kind::Texture>,
}

gpu_resource!(Texture => Texture);

impl Texture {
    pub(crate) fn new(inner: ResourceOwner<kind::Texture>) -> Self {
        Self { inner }
    }

    pub fn create_view(&self, options: &TextureViewOptions) -> TextureView {
        let device = self.inner.device();
        TextureView::new(self.inner.spawn(device, |rm, texture| rm.create_texture_view(device, texture, options)))
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct TextureView {
    inner: ResourceOwner<kind::TextureView>,
}

gpu_resource!(TextureView => TextureView);

impl TextureView {
    pub(crate) fn new(inner: ResourceOwner<kind::TextureView>) -> Self {
        Self { inner }
    }
}
