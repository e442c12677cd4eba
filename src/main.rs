use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;
use simulive::{config::Config, init, logging, run, LaunchOptions};

#[derive(Parser, Debug)]
#[command(name = "simulive", about = "Headless simulated livestream overlay")]
struct Args {
    /// Config file to load (created with defaults when missing)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Text file with one custom comment per line
    #[arg(long)]
    comments: Option<PathBuf>,
    /// Local image to use as the host avatar
    #[arg(long)]
    avatar: Option<PathBuf>,
    /// Ask Gemini for a host avatar
    #[arg(long)]
    generate_avatar: bool,
    /// Seed the event generator for a reproducible session
    #[arg(long)]
    seed: Option<u64>,
    /// End the stream after this many seconds
    #[arg(long)]
    duration: Option<u64>,
    #[arg(short, long)]
    verbose: bool,
    /// Never contact the content provider
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let mut config = Config::new(args.config.as_deref())?;
    if args.verbose {
        config.verbose_logging = true;
    }
    logging::setup_logging(config.log_level)?;

    let options = LaunchOptions {
        comments_file: args.comments,
        avatar_file: args.avatar,
        generate_avatar: args.generate_avatar,
        seed: args.seed,
        offline: args.offline,
    };
    let clients = init(&config, &options).await?;

    run(clients, &config, args.duration.map(Duration::from_secs)).await?;

    Ok(())
}
