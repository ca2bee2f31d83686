mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fabricctl_core::Session;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a controller
        Command::Config(ref args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(ref args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "fabricctl", &mut std::io::stdout());
            Ok(())
        }

        // Everything else talks to the controller
        cmd => {
            let controller_config = config::build_controller_config(&cli.global)?;
            let cancel = CancellationToken::new();
            cancel_on_interrupt(cancel.clone());
            let mut session = Session::connect(&controller_config)?.with_cancellation(cancel);

            tracing::debug!(
                command = ?cmd,
                controller = %controller_config.url,
                check_mode = controller_config.check_mode,
                "dispatching command"
            );
            commands::dispatch(cmd, &mut session, &cli.global).await
        }
    }
}

/// Ctrl-C stops any in-flight wait; the ledger is still printed.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping");
            token.cancel();
        }
    });
}
