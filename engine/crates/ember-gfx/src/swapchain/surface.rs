use crate::{handle::kind, owner::ResourceOwner};

#[derive(Debug, Default, PartialEq)]
pub struct Surface {
    inner: ResourceOwner<kind::Surface>,
}

gpu_resource!(Surface => Surface);

impl Surface {
    pub(crate) fn new(inner: ResourceOwner<kind::Surface>) -> Self {
        Self { inner }
    }
}
