pub mod config;
pub mod error;
pub mod mcp;
pub mod network;

pub use config::ConductorConfig;
pub use error::{ConductorError, Result};
pub use mcp::ConductorMcpServer;
pub use network::{HttpProxy, TokenManager};
