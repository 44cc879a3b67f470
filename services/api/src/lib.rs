mod cli;
mod infra;
mod routes;
mod scheduler;
mod server;

use csfa_report::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
