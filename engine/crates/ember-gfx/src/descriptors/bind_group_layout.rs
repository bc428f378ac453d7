use crate::{handle::kind, owner::ResourceOwner};

#[derive(Debug, Default, PartialEq)]
pub struct BindGroupLayout {
    inner: ResourceOwner<kind::BindGroupLayout>,
}

gpu_resource!(BindGroupLayout => BindGroupLayout);

impl BindGroupLayout {
    pub(crate) fn new(inner: ResourceOwner<kind::BindGroupLayout>) -> Self {
        Self { inner }
    }
}
