//! Common test utilities and helpers

use adxkit::testing::ScriptedFactory;
use adxkit::{ExecutionHelper, ExecutionRequest};
use adxkit_core::retry::testing::RecordingSleeper;
use std::sync::Arc;

#[allow(dead_code)]
pub const CLUSTER: &str = "https://help.kusto.windows.net/";

#[allow(dead_code)]
pub const DATABASE: &str = "acme";

/// A request with every field filled in
#[allow(dead_code)]
pub fn full_request(statement: &str) -> ExecutionRequest {
    ExecutionRequest::new(
        CLUSTER,
        DATABASE,
        statement,
        "00000000-0000-0000-0000-000000000001",
        "app-secret",
        "00000000-0000-0000-0000-0000000000aa",
    )
}

/// Helper over a scripted collaborator with a recording clock
#[allow(dead_code)]
pub fn scripted_helper(
    factory: &ScriptedFactory,
    retries: u32,
) -> (ExecutionHelper<ScriptedFactory>, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::new());
    let helper = ExecutionHelper::with_factory(factory.clone(), retries)
        .expect("retries in range")
        .with_sleeper(sleeper.clone());
    (helper, sleeper)
}

/// Install a test subscriber once; honours `RUST_LOG`
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
