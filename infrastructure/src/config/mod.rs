//! Engine configuration loading

mod file_config;
mod loader;

pub use file_config::{EngineFileConfig, FileBridgeConfig, FileEngineConfig};
pub use loader::ConfigLoader;
