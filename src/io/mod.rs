pub mod config_io;
pub mod journal;
pub mod state;

pub use config_io::ConfigError;
