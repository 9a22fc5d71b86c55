use crate::config::SubscriberConfig;
use crate::frame::RgbFrame;
use gstreamer::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Errors that can occur in the subscriber pipeline
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("GStreamer error: {0}")]
    GStreamer(#[from] gstreamer::glib::Error),
    #[error("GStreamer state change error: {0}")]
    StateChange(#[from] gstreamer::StateChangeError),
    #[error("Failed to get element by name")]
    ElementNotFound,
    #[error("Failed to downcast pipeline")]
    DowncastError,
    #[error("Failed to get buffer from sample")]
    BufferError,
    #[error("Failed to get caps from sample: {0}")]
    CapsError(String),
    #[error("Flow error: {0}")]
    FlowError(String),
}

/// Receives an RTP/H264 stream over UDP and decodes it to raw RGB frames.
///
/// Pipeline:
/// ```text
/// udpsrc ! rtph264depay ! h264parse ! avdec_h264 ! videoconvert ! appsink
/// ```
///
/// Decoded frames are delivered through a channel; [`get_frame`] drains it
/// and hands back only the most recent one.
///
/// [`get_frame`]: VideoSubscriber::get_frame
pub struct VideoSubscriber {
    pipeline: gstreamer::Pipeline,
    frame_rx: flume::Receiver<RgbFrame>,
    running: AtomicBool,
}

impl VideoSubscriber {
    pub fn new(config: &SubscriberConfig) -> Result<Self, SubscribeError> {
        if !gstreamer::INITIALIZED.load(Ordering::Relaxed) {
            gstreamer::init()?;
        }

        let pipeline_desc = format!(
            "udpsrc address={host} port={port} \
             caps=\"application/x-rtp,media=(string)video,clock-rate=(int)90000,\
             encoding-name=(string)H264,payload=(int)96\" ! \
             rtph264depay ! \
             h264parse ! \
             avdec_h264 ! \
             videoconvert ! \
             video/x-raw,format=RGB ! \
             appsink name=sink emit-signals=true sync=false",
            host = config.endpoint.host,
            port = config.endpoint.port,
        );

        log::debug!("Creating subscriber pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| SubscribeError::DowncastError)?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or(SubscribeError::ElementNotFound)?
            .dynamic_cast::<gstreamer_app::AppSink>()
            .map_err(|_| SubscribeError::DowncastError)?;

        let (frame_tx, frame_rx) = flume::unbounded::<RgbFrame>();

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| match Self::handle_sample(sink) {
                    Ok(frame) => {
                        let _ = frame_tx.send(frame);
                        Ok(gstreamer::FlowSuccess::Ok)
                    }
                    Err(e) => {
                        log::error!("Error handling decoded sample: {}", e);
                        Err(gstreamer::FlowError::Error)
                    }
                })
                .build(),
        );

        Ok(Self {
            pipeline,
            frame_rx,
            running: AtomicBool::new(false),
        })
    }

    fn handle_sample(sink: &gstreamer_app::AppSink) -> Result<RgbFrame, SubscribeError> {
        let sample = sink
            .pull_sample()
            .map_err(|e| SubscribeError::FlowError(e.to_string()))?;

        let caps = sample.caps().ok_or(SubscribeError::BufferError)?;
        let info = gstreamer_video::VideoInfo::from_caps(caps)
            .map_err(|e| SubscribeError::CapsError(e.to_string()))?;

        let buffer = sample.buffer().ok_or(SubscribeError::BufferError)?;
        let map = buffer
            .map_readable()
            .map_err(|_| SubscribeError::BufferError)?;

        Ok(RgbFrame {
            data: map.as_slice().to_vec(),
            width: info.width(),
            height: info.height(),
        })
    }

    pub fn start(&self) -> Result<(), SubscribeError> {
        self.pipeline.set_state(gstreamer::State::Playing)?;
        self.running.store(true, Ordering::Release);
        log::info!("Subscriber pipeline started");
        Ok(())
    }

    /// Stop the pipeline. Safe to call more than once.
    pub fn stop(&self) -> Result<(), SubscribeError> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.pipeline.set_state(gstreamer::State::Null)?;
        log::info!("Subscriber pipeline stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Take the most recently decoded frame, if any.
    ///
    /// Non-blocking; older queued frames are discarded so the display never
    /// falls behind the stream.
    pub fn get_frame(&self) -> Option<RgbFrame> {
        self.frame_rx.try_iter().last()
    }
}

impl Drop for VideoSubscriber {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("Error stopping subscriber pipeline: {}", e);
        }
    }
}
