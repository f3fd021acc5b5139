//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over TCP, bound to localhost by default.

use crate::handler::RpcHandler;
use crate::types::GetJobRequest;
use jobwatch_core::application::{CycleScheduler, JobQuery, QueryService};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9531;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, query: QueryService, scheduler: Arc<CycleScheduler>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(query, scheduler)),
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address (useful with port 0) and the server handle.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = self.build_module()?;

        info!(addr = %local_addr, "JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok((local_addr, handle))
    }

    fn build_module(&self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());

        // Query APIs
        let handler = self.handler.clone();
        module.register_async_method("jobs.list.v1", move |params, _, _| {
            let handler = handler.clone();
            async move {
                // Missing params means the default query
                let query: Option<JobQuery> = params.parse()?;
                handler.list_jobs(query.unwrap_or_default()).await
            }
        })
        .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module.register_async_method("jobs.get.v1", move |params, _, _| {
            let handler = handler.clone();
            async move {
                let req: GetJobRequest = params.parse()?;
                handler.get_job(req).await
            }
        })
        .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module.register_async_method("jobs.stats.v1", move |_, _, _| {
            let handler = handler.clone();
            async move { handler.stats().await }
        })
        .map_err(|e| e.to_string())?;

        // Cycle control
        let handler = self.handler.clone();
        module.register_async_method("cycle.run.v1", move |_, _, _| {
            let handler = handler.clone();
            async move { handler.run_cycle().await }
        })
        .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module.register_async_method("cycle.last.v1", move |_, _, _| {
            let handler = handler.clone();
            async move { handler.last_cycle().await }
        })
        .map_err(|e| e.to_string())?;

        // Admin APIs
        let handler = self.handler.clone();
        module.register_async_method("admin.health.v1", move |_, _, _| {
            let handler = handler.clone();
            async move { handler.health().await }
        })
        .map_err(|e| e.to_string())?;

        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobwatch_core::application::{ReconcileService, ScrapeCycle};
    use jobwatch_core::domain::timestamp::from_millis;
    use jobwatch_core::domain::{JobFields, JobRecord};
    use jobwatch_core::port::id_provider::mocks::SequentialIdProvider;
    use jobwatch_core::port::job_source::mocks::StaticSource;
    use jobwatch_core::port::notifier::mocks::RecordingNotifier;
    use jobwatch_core::port::record_store::mocks::InMemoryRecordStore;
    use jobwatch_core::port::time_provider::SystemTimeProvider;
    use jsonrpsee::core::client::ClientT;
    use jsonrpsee::core::params::ObjectParams;
    use jsonrpsee::http_client::HttpClientBuilder;
    use jsonrpsee::rpc_params;
    use std::time::Duration;

    fn named(value: serde_json::Value) -> ObjectParams {
        let mut params = ObjectParams::new();
        if let serde_json::Value::Object(map) = value {
            for (name, v) in map {
                params.insert(&name, v).unwrap();
            }
        }
        params
    }

    async fn start_test_server() -> (String, ServerHandle) {
        let seeded = vec![
            JobRecord::create(
                JobFields::new("SDE2", "Amazon").with_job_id("123"),
                from_millis(1_000),
            ),
            JobRecord::create(
                JobFields::new("SRE", "Google").with_job_id("g1"),
                from_millis(2_000),
            ),
        ];
        let store = Arc::new(InMemoryRecordStore::with_records("store", seeded));
        let delta = Arc::new(InMemoryRecordStore::new("delta"));
        let time = Arc::new(SystemTimeProvider);
        let reconciler = Arc::new(ReconcileService::new(store.clone(), delta, time.clone()));
        let cycle = Arc::new(ScrapeCycle::new(
            vec![Arc::new(StaticSource::new(
                "meta",
                vec![JobFields::new("PM", "Meta").with_link("https://m/1")],
            ))],
            reconciler,
            Arc::new(RecordingNotifier::default()),
            time,
            Arc::new(SequentialIdProvider::default()),
        ));
        let scheduler = Arc::new(CycleScheduler::new(cycle, Duration::from_secs(3600), false));

        let config = RpcServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        };
        let (addr, handle) = RpcServer::new(config, QueryService::new(store), scheduler)
            .start()
            .await
            .unwrap();
        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_list_get_and_stats() {
        let (url, handle) = start_test_server().await;
        let client = HttpClientBuilder::default().build(&url).unwrap();

        let page: serde_json::Value = client
            .request("jobs.list.v1", named(serde_json::json!({"company": "amazon"})))
            .await
            .unwrap();
        assert_eq!(page["total"], 1);
        let key = page["items"][0]["identityKey"].as_str().unwrap().to_string();
        assert_eq!(key, "AmazonSDE2123");

        let entry: serde_json::Value = client
            .request("jobs.get.v1", named(serde_json::json!({"identityKey": key})))
            .await
            .unwrap();
        assert_eq!(entry["title"], "SDE2");

        let stats: serde_json::Value = client
            .request("jobs.stats.v1", rpc_params![])
            .await
            .unwrap();
        assert_eq!(stats["total"], 2);

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found() {
        let (url, handle) = start_test_server().await;
        let client = HttpClientBuilder::default().build(&url).unwrap();

        let err = client
            .request::<serde_json::Value, _>(
                "jobs.get.v1",
                named(serde_json::json!({"identityKey": "nope"})),
            )
            .await
            .unwrap_err();

        match err {
            jsonrpsee::core::ClientError::Call(obj) => {
                assert_eq!(obj.code(), crate::error::code::NOT_FOUND)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn test_run_then_last_cycle() {
        let (url, handle) = start_test_server().await;
        let client = HttpClientBuilder::default().build(&url).unwrap();

        let none: Option<serde_json::Value> = client
            .request("cycle.last.v1", rpc_params![])
            .await
            .unwrap();
        assert!(none.is_none());

        let summary: serde_json::Value = client
            .request("cycle.run.v1", rpc_params![])
            .await
            .unwrap();
        assert_eq!(summary["newCount"], 1);
        assert_eq!(summary["totalRecords"], 3);

        let last: serde_json::Value = client
            .request("cycle.last.v1", rpc_params![])
            .await
            .unwrap();
        assert_eq!(last["cycleId"], summary["cycleId"]);

        let health: serde_json::Value = client
            .request("admin.health.v1", rpc_params![])
            .await
            .unwrap();
        assert_eq!(health["cycleRunning"], false);
        assert_eq!(health["sources"][0], "meta");

        handle.stop().unwrap();
    }
}
