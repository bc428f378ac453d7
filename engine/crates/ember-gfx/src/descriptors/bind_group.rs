use crate::{handle::kind, options::BindGroupEntry, owner::ResourceOwner};

#[derive(Debug, Default, PartialEq)]
pub struct BindGroup {
    inner: ResourceOwner<kind::BindGroup>,
}

gpu_resource!(@handle BindGroup => BindGroup);

impl BindGroup {
    pub(crate) fn new(inner: ResourceOwner<kind::BindGroup>) -> Self {
        Self { inner }
    }

    /// 除了句柄本身有效之外，还要求后端记录仍然存活（所属的 pool 可能已经 reset）
    pub fn is_valid(&self) -> bool {
        self.inner.read(|rm, bind_group| rm.contains(bind_group)).unwrap_or(false)
    }

    pub fn update(&self, entry: &BindGroupEntry) {
        self.inner.write(|rm, bind_group| rm.update_bind_group(bind_group, entry));
    }
}
