mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use gestor360::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
