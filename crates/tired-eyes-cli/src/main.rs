use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod shell;

#[derive(Parser)]
#[command(name = "tired-eyes", version, about = "Tired Eyes break reminder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the work/break reminder in the foreground
    Run(commands::run::RunArgs),
    /// Settings management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print the effective light/dark appearance
    Theme(commands::theme::ThemeArgs),
    /// Send a one-off break notification
    Notify(commands::notify::NotifyArgs),
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tired_eyes=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Theme(args) => commands::theme::run(args),
        Commands::Notify(args) => commands::notify::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
