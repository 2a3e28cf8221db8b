use anyhow::Result;
use gt_cli::{Cli, Commands, Parser};
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let conn = &cli.connection;
    match &cli.command {
        Commands::Peek(args) => args.run(conn).await,
        Commands::Nudge(args) => args.run(conn).await,
        Commands::Keys(args) => args.run(conn).await,
        Commands::Status(args) => args.run(conn).await,
        Commands::State(args) => args.run(conn).await,
        Commands::Tunnel(args) => args.run(conn).await,
    }
}
