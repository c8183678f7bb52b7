use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "masonry",
    about = "Masonry — measurement-driven column layout",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign items to columns from a list of heights.
    ///
    /// Heights are a JSON array of numbers, one per item in order. With
    /// the count strategy the heights only determine the item count.
    Assign {
        /// Path to masonry.toml (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<String>,
        /// JSON array of item heights, e.g. "[300, 200, 100]"
        #[arg(long)]
        heights: String,
        /// Viewport width used to resolve breakpoints
        #[arg(short, long)]
        width: Option<f64>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Print the column count for a viewport width
    Resolve {
        #[arg(short, long)]
        config: Option<String>,
        #[arg(short, long)]
        width: f64,
    },
    /// Replay a timestamped measurement trace through the engine
    Simulate {
        #[arg(short, long)]
        config: Option<String>,
        /// Trace file (JSON)
        #[arg(short, long)]
        trace: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("masonry=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Assign {
            config,
            heights,
            width,
            format,
        } => commands::assign::run(config.as_deref(), &heights, width, &format),
        Commands::Resolve { config, width } => {
            commands::resolve::run(config.as_deref(), width)
        }
        Commands::Simulate {
            config,
            trace,
            format,
        } => commands::simulate::run(config.as_deref(), &trace, &format),
    }
}
