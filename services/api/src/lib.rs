mod cli;
mod evaluate;
mod infra;
mod routes;
mod server;

use patent_grader::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
