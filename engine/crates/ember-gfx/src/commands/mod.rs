pub mod command_recorder;
pub mod fence;
pub mod semaphore;
pub mod timestamp_query_recorder;

pub use command_recorder::{CommandBuffer, CommandRecorder};
pub use fence::Fence;
pub use semaphore::GpuSemaphore;
pub use timestamp_query_recorder::TimestampQueryRecorder;
