pub mod memory;
pub mod network;

pub use memory::MemoryBuilder;
pub use network::DenseQBuilder;
