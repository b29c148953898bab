use crate::cli::PickParams;
use crate::error::PhotoPickError;
use crate::pick::{Orchestrator, PickOutcome};
use crate::utils::build_http_client;

pub async fn run_pick(params: PickParams) -> Result<PickOutcome, PhotoPickError> {
    let PickParams { app_config } = params;

    tracing::info!(
        album_id = %app_config.album_id,
        output_dir = %app_config.output_dir.display(),
        ledger = %app_config.ledger_path.display(),
        hash_algorithm = app_config.hash_algorithm.as_str(),
        "Picking a photo"
    );

    let client = build_http_client(&app_config.timeouts)?;
    let orchestrator = Orchestrator::from_config(&app_config, client);
    let outcome = orchestrator.run().await?;

    tracing::info!(state = ?outcome.terminal_state(), "Run finished");
    Ok(outcome)
}
