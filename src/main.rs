use clap::Parser;
use shelf_feed_lib::ServiceConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::from_filename(".env.local");
    shelf_feed_lib::init_tracing();

    let config = ServiceConfig::parse();
    shelf_feed_lib::run(config).await?;
    Ok(())
}
