use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory and an initial `config.json` that points at `base_url`.
///
/// # Arguments
/// - `jarview_home` - The directory that will be the root of the data directory, e.g.
///   `$HOME/jarview`
/// - `base_url` - The base URL of the budgeting API, e.g. `https://localhost:7042/api`
///
/// # Errors
/// - Returns an error if the URL is invalid or any file operation fails.
pub async fn init(jarview_home: &Path, base_url: &str) -> Result<Out<()>> {
    let config = Config::create(jarview_home, base_url)
        .await
        .map_err(|e| e.context("Unable to create the data directory and config"))?;
    Ok(format!(
        "Created {} for the API at {}",
        config.config_path().display(),
        config.base_url()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;

    #[tokio::test]
    async fn test_init() {
        let dir = tempfile::TempDir::new().unwrap();
        let home = dir.path().join("home");
        let out = init(&home, "http://localhost:5000/api").await.unwrap();
        assert!(out.message().contains("http://localhost:5000/api/"));
        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.base_url().as_str(), "http://localhost:5000/api/");
    }

    #[tokio::test]
    async fn test_init_bad_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let e = init(dir.path(), "not a url").await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Config);
    }
}
