mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_generate, run_inspect};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let args = cli::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Generate {
            output_dir,
            all,
            format,
            output,
            ready_timeout,
            no_color,
        } => {
            run_generate(
                args.config,
                output_dir,
                all,
                format,
                output,
                ready_timeout,
                no_color,
            )
            .await
        }
        Commands::Inspect {
            output_dir,
            all,
            format,
            output,
        } => run_inspect(args.config, output_dir, all, format, output),
    }
}

/// Logs go to stderr; stdout carries the output document.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ogshot=debug,ogshot_lib=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
