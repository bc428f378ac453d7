use crate::{
    commands::TimestampQueryRecorder,
    handle::kind,
    options::{BufferCopy, TimestampQueryRecorderOptions},
    owner::ResourceOwner,
};

/// 命令录制器，`finish` 之后得到可以提交的 [`CommandBuffer`]
#[derive(Debug, Default, PartialEq)]
pub struct CommandRecorder {
    inner: ResourceOwner<kind::CommandRecorder>,
}

gpu_resource!(CommandRecorder => CommandRecorder);

impl CommandRecorder {
    pub(crate) fn new(inner: ResourceOwner<kind::CommandRecorder>) -> Self {
        Self { inner }
    }

    pub fn copy_buffer(&self, copy: &BufferCopy) {
        self.inner.write(|rm, recorder| rm.copy_buffer(recorder, copy));
    }

    /// 之后写入的时间戳都录制在这个 recorder 中
    pub fn begin_timestamp_recording(&self, options: &TimestampQueryRecorderOptions) -> TimestampQueryRecorder {
        let device = self.inner.device();
        TimestampQueryRecorder::new(
            self.inner.spawn(device, |rm, recorder| rm.create_timestamp_query_recorder(device, recorder, options)),
        )
    }

    /// 结束录制；重复调用得到的是无效的 command buffer
    pub fn finish(&self) -> CommandBuffer {
        let device = self.inner.device();
        CommandBuffer::new(self.inner.spawn(device, |rm, recorder| rm.finish_command_recorder(recorder)))
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct CommandBuffer {
    inner: ResourceOwner<kind::CommandBuffer>,
}

gpu_resource!(CommandBuffer => CommandBuffer);

impl CommandBuffer {
    pub(crate) fn new(inner: ResourceOwner<kind::CommandBuffer>) -> Self {
        Self { inner }
    }
}
