//! Lambda runtime entry point for the test results sink.
//!
//! Wires the handlers to in-memory stores and the structured-logging tracer.
//!
//! Environment variables:
//! - `AWS_LAMBDA_RUNTIME_API` - Required, set by the hosting runtime
//! - `TEST_SINK_*` - Service configuration overrides (see `ServiceConfig`)
//! - `RUST_LOG` - Log filter (default: `info`)

use aws_lambda_events::apigw::ApiGatewayProxyRequest;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use request_observability::LoggingTracer;
use std::sync::Arc;
use test_sink_service::storage::{InMemoryBlobStore, InMemoryRecordStore};
use test_sink_service::{ServiceConfig, TestSinkService};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = ServiceConfig::load()?;

    let service = Arc::new(TestSinkService::new(
        config,
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(InMemoryBlobStore::new()),
        Arc::new(LoggingTracer::new()),
    ));

    run(service_fn(
        move |event: LambdaEvent<ApiGatewayProxyRequest>| {
            let service = Arc::clone(&service);
            async move { service.handle(event).await.map_err(Error::from) }
        },
    ))
    .await
}
