//! Test server harness for E2E testing
//!
//! Provides `TestAaaServer` for spawning real AAA server instances in tests.

use crate::identity_fixtures::{TEST_ADMIN_PASSWORD, TEST_ADMIN_USER, TEST_DOMAIN};
use aaa_service::app::AaaCore;
use aaa_service::config::Config;
use aaa_service::observability::metrics::init_metrics_recorder;
use aaa_service::routes;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// The global recorder can only be installed once per process; every
/// harness in a test binary shares this handle.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the AAA server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_e2e() -> Result<()> {
///     let server = TestAaaServer::spawn().await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAaaServer {
    addr: SocketAddr,
    core: Arc<AaaCore>,
    _handle: JoinHandle<()>,
}

impl TestAaaServer {
    /// Spawn a server with authentication disabled.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::new()).await
    }

    /// Spawn a server with authentication enabled.
    pub async fn spawn_with_auth() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::from([(
            "AAA_AUTH_ENABLED".to_string(),
            "true".to_string(),
        )]))
        .await
    }

    /// Spawn a server with extra configuration variables.
    ///
    /// The server will:
    /// - Create the bootstrap admin (`admin@sdn`) with the lowest bcrypt cost
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    ///
    /// Entries in `extra` override the harness defaults.
    pub async fn spawn_with_vars(extra: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AAA_BCRYPT_COST".to_string(), "10".to_string()),
            (
                "AAA_ADMIN_USER".to_string(),
                format!("{TEST_ADMIN_USER}@{TEST_DOMAIN}"),
            ),
            (
                "AAA_ADMIN_PASSWORD".to_string(),
                TEST_ADMIN_PASSWORD.to_string(),
            ),
        ]);
        vars.extend(extra);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        // bcrypt hashing of the admin password blocks
        let core = tokio::task::spawn_blocking(move || AaaCore::from_config(config))
            .await?
            .map_err(|e| anyhow::anyhow!("Failed to build AAA core: {}", e))?;
        let core = Arc::new(core);

        let app = routes::build_routes(Arc::clone(&core), metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            // The audit filter reads the peer address from ConnectInfo
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            core,
            _handle: handle,
        })
    }

    /// Get the core the server is running on.
    pub fn core(&self) -> &Arc<AaaCore> {
        &self.core
    }

    /// Get the base URL of the server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the server's socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestAaaServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
