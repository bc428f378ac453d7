use crate::{handle::kind, owner::ResourceOwner};

#[derive(Debug, Default, PartialEq)]
pub struct ShaderModule {
    inner: ResourceOwner<kind::ShaderModule>,
}

gpu_resource!(ShaderModule => ShaderModule);

impl ShaderModule {
    pub(crate) fn new(inner: ResourceOwner<kind::ShaderModule>) -> Self {
        Self { inner }
    }
}
