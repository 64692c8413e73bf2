// AWS Lambda binary entry point
//
// Build with: cargo build -p sesslog-ingest
// The lambda_runtime crate provides the tokio runtime.

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    sesslog_ingest::run().await
}
