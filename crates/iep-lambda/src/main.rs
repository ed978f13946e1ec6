// AWS Lambda binary entry point.
//
// Built independently from the root workspace: `cargo build -p iep-lambda`.
// The lambda_runtime crate provides the tokio runtime.

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    iep_lambda::run().await
}
