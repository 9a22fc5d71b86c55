use argh::FromArgs;
use framecast::{
    run_send_loop, setup_shutdown, FrameGenerator, PublisherConfig, VideoPublisher,
};

#[derive(FromArgs)]
/// Stream numbered video frames as RTP/H264 over UDP.
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
        Some(path) => match PublisherConfig::from_file(&path) {
            Ok(c) => c,
            Err(e) => {
                log::error!("Failed to load config from '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        None => PublisherConfig::default(),
    };

    let (_shutdown_tx, mut shutdown_rx) = match setup_shutdown() {
        Ok(channel) => channel,
        Err(e) => {
            log::error!("Failed to install signal handler: {}", e);
            std::process::exit(1);
        }
    };

    let generator = match FrameGenerator::new() {
        Ok(g) => g,
        Err(e) => {
            log::error!("Failed to create frame generator: {}", e);
            std::process::exit(1);
        }
    };

    let mut publisher = match VideoPublisher::new(&config) {
        Ok(p) => p,
        Err(e) => {
            log::error!("Failed to create publisher: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = publisher.start() {
        log::error!("Failed to start publisher: {}", e);
        std::process::exit(1);
    }

    log::info!(
        "Publishing {}x{} frames at {} FPS to {}:{}. Press Ctrl+C to stop",
        config.video.width,
        config.video.height,
        config.video.fps,
        config.endpoint.host,
        config.endpoint.port
    );

    run_send_loop(&mut publisher, &generator, &config.video, &mut shutdown_rx).await;

    log::info!("Publisher shut down");
}
