pub mod artifact;
pub mod conversion;
pub mod definition;
pub mod document;
pub mod machine;
pub mod visualizer;

pub use conversion::*;
pub use definition::*;
pub use machine::*;
pub use visualizer::visualize_config;
