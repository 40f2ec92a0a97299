//! algoviz - Algorithm Visualizer Server
//!
//! Serves the step-by-step algorithm visualizer to the browser.

use algoviz::{PlaybackConfig, Result, VizConfig, VizServer};
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "algoviz")]
#[command(version)]
#[command(about = "Step-paced, pausable algorithm visualizer", long_about = None)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8888)]
    port: u16,

    /// Allow cross-origin requests (`--cors false` to disable)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    cors: bool,

    /// Initial playback speed
    #[arg(long, default_value_t = algoviz::store::DEFAULT_SPEED)]
    speed: u32,

    /// Highest accepted playback speed
    #[arg(long, default_value_t = 100)]
    max_speed: u32,

    /// Delay per speed unit, in milliseconds
    #[arg(long, default_value_t = 10)]
    unit_delay_ms: u64,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = VizConfig {
        host: args.host,
        port: args.port,
        enable_cors: args.cors,
        enable_tracing: args.verbose > 0,
        playback: PlaybackConfig {
            default_speed: args.speed,
            max_speed: args.max_speed,
            unit_delay: Duration::from_millis(args.unit_delay_ms),
        },
    };

    let server = VizServer::new(config)?;
    log::info!(
        "{} algorithms available",
        server.state().session.registry().len()
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        log::info!("Shutdown signal received");
    };

    server.start_with_shutdown(shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_defaults_on() {
        let args = Args::try_parse_from(["algoviz"]).unwrap();
        assert!(args.cors);
        assert_eq!(args.port, 8888);
    }

    #[test]
    fn test_cors_can_be_disabled() {
        let args = Args::try_parse_from(["algoviz", "--cors", "false"]).unwrap();
        assert!(!args.cors);

        let args = Args::try_parse_from(["algoviz", "--cors", "true", "-vv"]).unwrap();
        assert!(args.cors);
        assert_eq!(args.verbose, 2);
    }
}
