//! Shared test harness: in-memory database, static directory, recording
//! submitter, and a registry loaded from a per-test manifest.
#![allow(dead_code)]

use std::sync::{Arc, Once};

use strix_common::config::EngineSettings;
use strix_common::events::EventBus;
use strix_engine::coordinator::JobPipelineCoordinator;
use strix_engine::db::init_memory;
use strix_engine::directory::StaticDirectory;
use strix_engine::dispatch::TaskSignatureBuilder;
use strix_engine::handlers::{Describable, HandlerRegistry, Runnable};
use strix_engine::models::TaskArgs;
use strix_engine::registry::{PluginConfigRegistry, PluginManifest};
use strix_engine::resolver::ParameterResolver;
use strix_engine::store::ParameterStore;
use strix_engine::submit::RecordingSubmitter;

/// Generic do-nothing handlers; test plugins point their entry points here
macro_rules! noop_handler {
    ($name:ident, $entry:literal) => {
        pub struct $name;

        impl Describable for $name {
            fn entry_point(&self) -> &'static str {
                $entry
            }
        }

        #[async_trait::async_trait]
        impl Runnable for $name {
            async fn run(&self, _args: &TaskArgs) -> anyhow::Result<serde_json::Value> {
                Ok(serde_json::json!({}))
            }
        }
    };
}

noop_handler!(GenericAnalyzer, "analyzers.generic");
noop_handler!(GenericConnector, "connectors.generic");
noop_handler!(GenericVisualizer, "visualizers.generic");
noop_handler!(GenericPivot, "pivots.generic");

pub struct Harness {
    pub pool: sqlx::SqlitePool,
    pub store: ParameterStore,
    pub directory: Arc<StaticDirectory>,
    pub registry: Arc<PluginConfigRegistry>,
    pub resolver: ParameterResolver,
    pub builder: TaskSignatureBuilder,
    pub submitter: Arc<RecordingSubmitter>,
    pub events: EventBus,
    pub coordinator: JobPipelineCoordinator,
}

static TRACING: Once = Once::new();

/// Route engine logs through the test writer; `RUST_LOG` filters as usual
fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .init();
    });
}

/// Build a full engine over an in-memory database and register the given
/// manifest. Entries may use the `*.generic` entry points above.
pub async fn harness(manifest_toml: &str) -> Harness {
    init_tracing();
    let pool = init_memory().await.expect("in-memory database");
    let settings = EngineSettings::default();

    let mut handlers = HandlerRegistry::with_builtins();
    handlers.register(Arc::new(GenericAnalyzer));
    handlers.register(Arc::new(GenericConnector));
    handlers.register(Arc::new(GenericVisualizer));
    handlers.register(Arc::new(GenericPivot));

    let store = ParameterStore::new(pool.clone());
    let directory = Arc::new(StaticDirectory::new());
    let resolver = ParameterResolver::new(store.clone(), directory.clone());
    let registry = Arc::new(PluginConfigRegistry::new(
        handlers,
        resolver.clone(),
        directory.clone(),
        settings.clone(),
    ));

    let manifest = PluginManifest::parse(manifest_toml).expect("test manifest parses");
    registry.load_manifest(&manifest);

    let builder = TaskSignatureBuilder::new(registry.clone(), resolver.clone(), settings);
    let submitter = Arc::new(RecordingSubmitter::new());
    let events = EventBus::new(256);
    let coordinator = JobPipelineCoordinator::new(
        pool.clone(),
        registry.clone(),
        builder.clone(),
        submitter.clone(),
        events.clone(),
    );

    Harness {
        pool,
        store,
        directory,
        registry,
        resolver,
        builder,
        submitter,
        events,
        coordinator,
    }
}
