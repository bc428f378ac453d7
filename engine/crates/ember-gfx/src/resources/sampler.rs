use crate::{handle::kind, owner::ResourceOwner};

#[derive(Debug, Default, PartialEq)]
pub struct Sampler {
    inner: ResourceOwner<kind::Sampler>,
}

gpu_resource!(Sampler => Sampler);

impl Sampler {
    pub(crate) fn new(inner: ResourceOwner<kind::Sampler>) -> Self {
        Self { inner }
    }
}

/// YCbCr -> RGB 的采样转换，通过 [`SamplerOptions::ycbcr_conversion`](crate::options::SamplerOptions) 使用
#[derive(Debug, Default, PartialEq)]
pub struct YcbcrConversion {
    inner: ResourceOwner<kind::YcbcrConversion>,
}

gpu_resource!(YcbcrConversion => YcbcrConversion);

impl YcbcrConversion {
    pub(crate) fn new(inner: ResourceOwner<kind::YcbcrConversion>) -> Self {
        Self { inner }
    }
}
