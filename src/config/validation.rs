use crate::config::schema::ConductorConfig;
use crate::error::{ConductorError, Result};

/// Validate the Conductor server address
pub fn validate_server_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(ConductorError::Config(
            "Conductor server URL is not set (CONDUCTOR_SERVER_URL)".to_string(),
        ));
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConductorError::Config(format!(
            "Invalid Conductor server URL: {}. Must start with http:// or https://",
            url
        )));
    }

    Ok(())
}

/// Validate the settings needed to start serving.
///
/// Credentials are checked later, when the first token is requested.
pub fn validate_config(config: &ConductorConfig) -> Result<()> {
    validate_server_url(&config.server_url)
}
