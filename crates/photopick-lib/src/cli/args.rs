use crate::config::{AuthStrategy, ConfigOverrides};
use crate::verification::HashAlgorithm;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::Level;

pub struct Args {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub log_level: Level,
}

#[derive(Debug, Parser)]
#[command(
    name = "photopick",
    version,
    about = "Download one photo from a remote album that has not been fetched yet"
)]
struct Cli {
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Sets the level of verbosity",
        action = ArgAction::Count
    )]
    verbose: u8,

    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Optional config file (TOML, YAML or JSON)"
    )]
    config: Option<PathBuf>,

    #[arg(long = "album-id", value_name = "ID", help = "Album to pick a photo from")]
    album_id: Option<String>,

    #[arg(long = "auth", value_enum, value_name = "STRATEGY", help = "Credential strategy")]
    auth: Option<AuthStrategy>,

    #[arg(
        long = "api-key",
        value_name = "KEY",
        help = "Static API key (implies --auth api-key)"
    )]
    api_key: Option<String>,

    #[arg(
        long = "token-file",
        value_name = "FILE",
        help = "Authorized-user token file (implies --auth oauth)"
    )]
    token_file: Option<PathBuf>,

    #[arg(
        long = "service-account-file",
        value_name = "FILE",
        help = "Service-account key file (implies --auth service-account)"
    )]
    service_account_file: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "output-dir",
        value_name = "DIR",
        help = "Directory downloaded photos are written to"
    )]
    output_dir: Option<PathBuf>,

    #[arg(
        short = 'l',
        long = "ledger",
        value_name = "FILE",
        help = "Ledger of fetched photo digests"
    )]
    ledger: Option<PathBuf>,

    #[arg(long = "hash-algorithm", value_enum, value_name = "ALG")]
    hash_algorithm: Option<HashAlgorithm>,

    #[arg(long = "page-size", value_name = "N", help = "Items requested per listing page")]
    page_size: Option<u32>,

    #[arg(long = "api-endpoint", value_name = "URL")]
    api_endpoint: Option<String>,

    #[arg(
        long = "max-retries",
        value_name = "N",
        help = "Maximum retry attempts for transient HTTP failures"
    )]
    max_retries: Option<u32>,

    #[arg(long = "initial-backoff-ms", value_name = "MS")]
    initial_backoff_ms: Option<u64>,

    #[arg(long = "request-timeout-secs", value_name = "SECS")]
    request_timeout_secs: Option<u64>,

    #[arg(long = "keep-partial", help = "Leave partially downloaded files in place on failure")]
    keep_partial: bool,

    #[arg(long = "no-progress", help = "Do not render a download progress bar")]
    no_progress: bool,
}

impl From<Cli> for Args {
    fn from(cli: Cli) -> Self {
        let log_level = match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let overrides = ConfigOverrides {
            album_id: cli.album_id,
            auth_strategy: cli.auth,
            api_key: cli.api_key,
            token_file: cli.token_file,
            service_account_file: cli.service_account_file,
            output_dir: cli.output_dir,
            ledger_path: cli.ledger,
            hash_algorithm: cli.hash_algorithm,
            page_size: cli.page_size,
            api_endpoint: cli.api_endpoint,
            max_retries: cli.max_retries,
            initial_backoff_ms: cli.initial_backoff_ms,
            request_timeout_secs: cli.request_timeout_secs,
            keep_partial: cli.keep_partial,
            no_progress: cli.no_progress,
        };

        Args {
            config_path: cli.config,
            overrides,
            log_level,
        }
    }
}

pub fn parse_args() -> Args {
    let args = Args::from(Cli::parse());

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(args.log_level.into())
                .from_env_lossy(),
        )
        .init();

    args
}
