//! Numbered-frame video streaming demo.
//!
//! Two binaries built on thin GStreamer pipeline wrappers:
//! - `send_frames` rasterizes a cycling counter onto white frames and
//!   streams them as RTP/H264 over UDP at a fixed rate.
//! - `recv_frames` decodes the stream and shows it in a window on a
//!   fixed-interval tick until Escape is pressed.

pub mod config;
pub mod display;
pub mod frame;
pub mod publish;
pub mod receiver;
pub mod sender;
pub mod shutdown;
pub mod subscribe;

pub use config::{
    ConfigError, DisplaySink, EndpointConfig, PublisherConfig, SubscriberConfig, VideoConfig,
};
pub use display::{DisplayError, VideoDisplay};
pub use frame::{FrameError, FrameGenerator, RgbFrame, DEFAULT_HEIGHT, DEFAULT_WIDTH};
pub use publish::{PublishError, VideoPublisher};
pub use receiver::{run_recv_loop, tick, FrameSink, FrameSource, KeyPoll, TerminalKeys, TickOutcome};
pub use sender::{run_send_loop, CounterCycle, FrameTransport};
pub use shutdown::setup_shutdown;
pub use subscribe::{SubscribeError, VideoSubscriber};
