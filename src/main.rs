use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::CommandFactory;
use tracing::error;

use azfederate::executor::{CommandExecutor, RealCommandExecutor};
use azfederate::{cli, init_logging, run_bootstrap, run_provision, run_validate};

/// Exit code for a batch that completed with at least one failed repository.
const EXIT_PARTIAL_FAILURE: i32 = 2;

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    if let cli::Commands::Completions(opts) = &args.command {
        let mut cmd = cli::Cli::command();
        clap_complete::generate(opts.shell, &mut cmd, env!("CARGO_PKG_NAME"), &mut std::io::stdout());
        return Ok(());
    }

    let log_level = match &args.command {
        cli::Commands::Provision(opts) => opts.common.log_level,
        cli::Commands::Bootstrap(opts) => opts.common.log_level,
        cli::Commands::Validate(opts) => opts.common.log_level,
        cli::Commands::Completions(_) => unreachable!("handled above"),
    };
    init_logging(log_level)?;

    match &args.command {
        cli::Commands::Provision(opts) => {
            let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor {
                dry_run: opts.dry_run,
            });
            match run_provision(opts, executor) {
                Ok(summary) if summary.all_succeeded() => {}
                Ok(_) => process::exit(EXIT_PARTIAL_FAILURE),
                Err(e) => {
                    error!("provisioning aborted: {:#}", e);
                    process::exit(1);
                }
            }
        }
        cli::Commands::Bootstrap(opts) => {
            let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor {
                dry_run: opts.dry_run,
            });
            if let Err(e) = run_bootstrap(opts, executor) {
                error!("bootstrap failed: {:#}", e);
                process::exit(1);
            }
        }
        cli::Commands::Validate(opts) => {
            if let Err(e) = run_validate(opts) {
                error!("validation failed: {:#}", e);
                process::exit(1);
            }
        }
        cli::Commands::Completions(_) => unreachable!("handled above"),
    }

    Ok(())
}
