use photopick_lib::cli::{parse_args, resolve_params, run_pick};
use photopick_lib::error::PhotoPickError;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("Failed to install error report handler: {e}");
    }

    let args = parse_args();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        let params = match resolve_params(&args) {
            Ok(params) => params,
            Err(e) => return report_error(&e),
        };

        tokio::select! {
            result = run_pick(params) => match result {
                Ok(outcome) => {
                    println!("{}", outcome.summary());
                    ExitCode::from(outcome.exit_code())
                }
                Err(e) => report_error(&e),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted; ledger left unchanged");
                println!("Interrupted.");
                ExitCode::from(PhotoPickError::EXIT_INTERRUPTED)
            }
        }
    })
}

fn report_error(err: &PhotoPickError) -> ExitCode {
    tracing::error!(error = %err, "Run failed");
    println!("Error: {err}");
    ExitCode::from(err.exit_code())
}
