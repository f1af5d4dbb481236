use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ogshot")]
#[command(
    version,
    about = "ogshot - Generate preview images for statically rendered sites",
    long_about = "ogshot\n\nModes:\n- generate: run the render pass over a finished output directory, strip image directives from the pages and capture every queued page to <route>/__og_image__/og.png.\n- inspect: dry run that reports per-page status and the capture plan without touching files or starting processes.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) with defaults, route rules, server and browser settings; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture preview images for a finished output directory
    Generate {
        #[arg(value_name = "OUTPUT_DIR", help = "Directory holding the rendered site")]
        output_dir: PathBuf,

        #[arg(
            long,
            help = "Treat the run as a full pre-render: capture every eligible page, not only static ones"
        )]
        all: bool,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,

        #[arg(
            long,
            value_name = "SECS",
            help = "Seconds to wait for the preview server to become ready (0 waits indefinitely)"
        )]
        ready_timeout: Option<u64>,

        #[arg(long, help = "Disable colored progress lines")]
        no_color: bool,
    },
    /// Report what generate would do, without side effects
    Inspect {
        #[arg(value_name = "OUTPUT_DIR", help = "Directory holding the rendered site")]
        output_dir: PathBuf,

        #[arg(long, help = "Plan as a full pre-render")]
        all: bool,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
