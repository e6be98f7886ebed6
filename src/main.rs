use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hedge_charts::ChartGenerator;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("hedge_charts=debug".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap()))
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let cli = Cli::parse();
    let request = cli.to_request();
    info!("📊 Generating {} chart for {} over {} day(s)", request.granularity, request.symbol, request.lookback_days);

    let generator = match ChartGenerator::from_env() {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to set up market data client: {}", e);
            std::process::exit(1);
        }
    };

    match generator.generate_png(&request, cli.output.as_deref()).await {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            error!("Chart generation failed: {}", e);
            std::process::exit(1);
        }
    }
}
