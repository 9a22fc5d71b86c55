use argh::FromArgs;
use crossterm::terminal;
use framecast::{
    run_recv_loop, setup_shutdown, SubscriberConfig, TerminalKeys, VideoDisplay, VideoSubscriber,
};

#[derive(FromArgs)]
/// Receive an RTP/H264 stream over UDP and display it in a window.
struct Args {
    /// path to the configuration file (defaults apply when omitted)
    #[argh(option, short = 'c')]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let args: Args = argh::from_env();

    let config = match args.config {
        Some(path) => match SubscriberConfig::from_file(&path) {
            Ok(c) => c,
            Err(e) => {
                log::error!("Failed to load config from '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        None => SubscriberConfig::default(),
    };

    let (_shutdown_tx, mut shutdown_rx) = match setup_shutdown() {
        Ok(channel) => channel,
        Err(e) => {
            log::error!("Failed to install signal handler: {}", e);
            std::process::exit(1);
        }
    };

    let mut subscriber = match VideoSubscriber::new(&config) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to create subscriber: {}", e);
            std::process::exit(1);
        }
    };

    let mut display = match VideoDisplay::new(config.display) {
        Ok(d) => d,
        Err(e) => {
            log::error!("Failed to create display: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = subscriber.start() {
        log::error!("Failed to start subscriber: {}", e);
        std::process::exit(1);
    }

    // Raw mode so Escape arrives unbuffered. Losing it only costs key
    // handling, so keep going with a warning.
    let raw_mode = terminal::enable_raw_mode().is_ok();
    if !raw_mode {
        log::warn!("Could not enable terminal raw mode; Escape key may not register");
    }

    log::info!(
        "Receiving frames on {}:{}. Press ESC to stop",
        config.endpoint.host,
        config.endpoint.port
    );

    let mut keys = TerminalKeys;
    run_recv_loop(
        &mut subscriber,
        &mut display,
        &mut keys,
        config.fps,
        &mut shutdown_rx,
    )
    .await;

    if raw_mode {
        if let Err(e) = terminal::disable_raw_mode() {
            log::error!("Failed to restore terminal mode: {}", e);
        }
    }

    log::info!("Subscriber shut down");
}
