use queue_probe_cli::{run_cli, CliError};
use tracing::error;

#[tokio::main]
async fn main() {
    // Run CLI and handle errors
    if let Err(e) = run_cli().await {
        match &e {
            // No subscriber is installed when logging setup itself failed
            CliError::InvalidArgument { .. } => eprintln!("queue-probe: {}", e),
            _ => error!(error = %e, exit_code = e.exit_code(), "queue-probe failed"),
        }

        std::process::exit(e.exit_code());
    }
}
