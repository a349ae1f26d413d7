//! Credential-caching HTTP client for the Conductor REST API.

pub mod proxy;
pub mod token;

pub use proxy::{join_url, Headers, HttpProxy};
pub use token::{Credential, TokenManager};
