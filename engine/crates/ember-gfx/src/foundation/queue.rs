use crate::{
    handle::kind,
    options::{PresentOptions, QueueDescription, SubmitOptions},
    owner::ResourceOwner,
    types::{PresentResult, QueueFlags},
};

/// 设备上的一个队列，由 [`Device`](crate::foundation::Device) 持有
#[derive(Debug, Default, PartialEq)]
pub struct Queue {
    inner: ResourceOwner<kind::Queue>,
}

gpu_resource!(Queue => Queue);

impl Queue {
    pub(crate) fn new(inner: ResourceOwner<kind::Queue>) -> Self {
        Self { inner }
    }

    pub fn description(&self) -> Option<QueueDescription> {
        self.inner
            .read(|rm, queue| rm.device_queues(self.inner.device()).into_iter().find(|desc| desc.queue == queue))
            .flatten()
    }

    pub fn flags(&self) -> QueueFlags {
        self.description().map(|desc| desc.flags).unwrap_or(QueueFlags::empty())
    }

    pub fn submit(&self, options: &SubmitOptions) {
        let _span = ember_crate_tools::profile_span!("Queue::submit");
        self.inner.write(|rm, queue| rm.submit(queue, options));
    }

    pub fn present(&self, options: &PresentOptions) -> PresentResult {
        self.inner.write(|rm, queue| rm.present(queue, options)).unwrap_or(PresentResult::Error)
    }

    pub fn wait_until_idle(&self) {
        self.inner.read(|rm, queue| rm.wait_queue_idle(queue));
    }
}
