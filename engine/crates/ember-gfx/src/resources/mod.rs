pub mod buffer;
pub mod sampler;
pub mod texture;

pub use buffer::Buffer;
pub use sampler::{Sampler, YcbcrConversion};
pub use texture::{Texture, TextureView};
