pub mod config;
pub mod outputs;
pub mod types;

pub use config::PlinthConfig;
pub use outputs::Outputs;
pub use types::*;
