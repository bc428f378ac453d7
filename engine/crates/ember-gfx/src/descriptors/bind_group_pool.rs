use crate::{handle::kind, owner::ResourceOwner};

/// 显式管理的 bind group pool
///
/// [`BindGroupPool::reset`] 会一次性释放从它分配的所有 bind group，
/// 这些 [`BindGroup`](crate::descriptors::BindGroup) 之后 `is_valid()` 返回 false，销毁时也不会再做任何事。
#[derive(Debug, Default, PartialEq)]
pub struct BindGroupPool {
    inner: ResourceOwner<kind::BindGroupPool>,
}

gpu_resource!(BindGroupPool => BindGroupPool);

impl BindGroupPool {
    pub(crate) fn new(inner: ResourceOwner<kind::BindGroupPool>) -> Self {
        Self { inner }
    }

    pub fn reset(&self) {
        self.inner.write(|rm, pool| rm.reset_bind_group_pool(pool));
    }

    /// 当前从这个 pool 分配出去、仍然存活的 bind group 数量
    pub fn allocated_bind_group_count(&self) -> u32 {
        self.inner.read(|rm, pool| rm.bind_group_pool_allocated(pool)).unwrap_or(0)
    }
}
