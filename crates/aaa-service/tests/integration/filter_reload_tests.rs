//! Hot reload of the filter chain from a properties file

use aaa_test_utils::TestAaaServer;
use reqwest::header::WWW_AUTHENTICATE;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::path::PathBuf;

/// Properties file in the temp dir, removed on drop.
struct FilterConfigFile {
    path: PathBuf,
}

impl FilterConfigFile {
    fn new(contents: &str) -> Result<Self, anyhow::Error> {
        let path = std::env::temp_dir()
            .join(format!("aaa-filters-{}.properties", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents)?;
        Ok(Self { path })
    }

    fn rewrite(&self, contents: &str) -> Result<(), anyhow::Error> {
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl Drop for FilterConfigFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn spawn_with_filter_file(file: &FilterConfigFile) -> Result<TestAaaServer, anyhow::Error> {
    TestAaaServer::spawn_with_vars(HashMap::from([
        ("AAA_AUTH_ENABLED".to_string(), "true".to_string()),
        (
            "AAA_FILTER_CONFIG".to_string(),
            file.path.display().to_string(),
        ),
    ]))
    .await
}

#[tokio::test]
async fn test_chain_without_authentication_filter_is_open() -> Result<(), anyhow::Error> {
    let file = FilterConfigFile::new("customFilterList = auth-log\n")?;
    let server = spawn_with_filter_file(&file).await?;

    assert_eq!(server.core().pipeline.stage_names(), ["auth-log"]);

    let response = reqwest::get(format!("{}/restconf", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_reload_installs_new_chain_and_params() -> Result<(), anyhow::Error> {
    let file = FilterConfigFile::new("customFilterList=auth-log\n")?;
    let server = spawn_with_filter_file(&file).await?;

    file.rewrite(
        "customFilterList=auth-log, authentication\n\
         authentication.realm=test-realm\n",
    )?;
    let core = std::sync::Arc::clone(server.core());
    tokio::task::spawn_blocking(move || core.reload_filter_chain()).await??;

    assert_eq!(
        server.core().pipeline.stage_names(),
        ["auth-log", "authentication"]
    );

    let response = reqwest::get(format!("{}/restconf", server.url())).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok()),
        Some("Basic realm=\"test-realm\"")
    );

    Ok(())
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_chain() -> Result<(), anyhow::Error> {
    let file = FilterConfigFile::new("customFilterList=auth-log,authentication\n")?;
    let server = spawn_with_filter_file(&file).await?;

    // An empty realm fails authentication init
    file.rewrite(
        "customFilterList=authentication\n\
         authentication.realm=\n",
    )?;
    let core = std::sync::Arc::clone(server.core());
    let result = tokio::task::spawn_blocking(move || core.reload_filter_chain()).await?;
    assert!(result.is_err());

    file.rewrite("[customFilterList\n")?;
    let core = std::sync::Arc::clone(server.core());
    let result = tokio::task::spawn_blocking(move || core.reload_filter_chain()).await?;
    assert!(result.is_err());

    assert_eq!(
        server.core().pipeline.stage_names(),
        ["auth-log", "authentication"]
    );
    let response = reqwest::get(format!("{}/restconf", server.url())).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
