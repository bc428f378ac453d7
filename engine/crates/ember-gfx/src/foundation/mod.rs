pub mod adapter;
pub mod device;
pub mod instance;
pub mod queue;

pub use adapter::Adapter;
pub use device::Device;
pub use instance::Instance;
pub use queue::Queue;
