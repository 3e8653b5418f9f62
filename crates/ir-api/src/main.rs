#[tokio::main]
async fn main() {
    if let Err(err) = ir_api::run().await {
        tracing::error!(error = %err, "ir-api failed");
        eprintln!("ir-api failed: {err}");
        std::process::exit(1);
    }
}
