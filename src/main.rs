use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = authproxy::cli::Cli::parse();
    if let Err(e) = authproxy::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
