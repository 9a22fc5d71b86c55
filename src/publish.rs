use crate::config::PublisherConfig;
use crate::frame::RgbFrame;
use gstreamer::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;

/// Errors that can occur in the publisher pipeline
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("GStreamer error: {0}")]
    GStreamer(#[from] gstreamer::glib::Error),
    #[error("GStreamer state change error: {0}")]
    StateChange(#[from] gstreamer::StateChangeError),
    #[error("Failed to get element by name")]
    ElementNotFound,
    #[error("Failed to downcast pipeline")]
    DowncastError,
    #[error("Failed to allocate buffer")]
    BufferError,
}

/// Encodes raw RGB frames to H264 and streams them as RTP over UDP.
///
/// Pipeline: `appsrc -> videoconvert -> x264enc -> rtph264pay -> udpsink`
pub struct VideoPublisher {
    pipeline: gstreamer::Pipeline,
    appsrc: gstreamer_app::AppSrc,
    width: u32,
    height: u32,
    frame_duration_ns: u64,
    frames_pushed: AtomicU64,
    running: AtomicBool,
}

impl VideoPublisher {
    pub fn new(config: &PublisherConfig) -> Result<Self, PublishError> {
        if !gstreamer::INITIALIZED.load(Ordering::Relaxed) {
            gstreamer::init()?;
        }

        let width = config.video.width;
        let height = config.video.height;
        let fps = config.video.fps;

        let pipeline_desc = format!(
            "appsrc name=src is-live=true format=time \
             caps=video/x-raw,format=RGB,width={width},height={height},framerate={fps}/1 ! \
             videoconvert ! \
             x264enc tune=zerolatency bitrate={bitrate} speed-preset=superfast key-int-max={fps} ! \
             rtph264pay config-interval=1 pt=96 ! \
             udpsink host={host} port={port} sync=false",
            bitrate = config.bitrate_kbps,
            host = config.endpoint.host,
            port = config.endpoint.port,
        );

        log::debug!("Creating publisher pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| PublishError::DowncastError)?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or(PublishError::ElementNotFound)?
            .dynamic_cast::<gstreamer_app::AppSrc>()
            .map_err(|_| PublishError::DowncastError)?;

        appsrc.set_format(gstreamer::Format::Time);
        appsrc.set_is_live(true);
        appsrc.set_stream_type(gstreamer_app::AppStreamType::Stream);

        Ok(Self {
            pipeline,
            appsrc,
            width,
            height,
            frame_duration_ns: 1_000_000_000 / fps.max(1) as u64,
            frames_pushed: AtomicU64::new(0),
            running: AtomicBool::new(false),
        })
    }

    pub fn start(&self) -> Result<(), PublishError> {
        self.pipeline.set_state(gstreamer::State::Playing)?;
        self.running.store(true, Ordering::Release);
        log::info!("Publisher pipeline started");
        Ok(())
    }

    /// Stop the pipeline. Safe to call more than once.
    pub fn stop(&self) -> Result<(), PublishError> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        self.appsrc.end_of_stream().ok();
        self.pipeline.set_state(gstreamer::State::Null)?;
        log::info!("Publisher pipeline stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Submit one frame to the transport.
    ///
    /// Returns false (and logs) on a size mismatch or push failure; the
    /// caller decides whether to keep going.
    pub fn publish_frame(&self, frame: &RgbFrame) -> bool {
        if frame.width != self.width || frame.height != self.height {
            log::warn!(
                "Frame size {}x{} does not match pipeline caps {}x{}",
                frame.width,
                frame.height,
                self.width,
                self.height
            );
            return false;
        }

        let mut buffer = match gstreamer::Buffer::with_size(frame.data.len()) {
            Ok(b) => b,
            Err(_) => {
                log::warn!("Failed to allocate GStreamer buffer");
                return false;
            }
        };

        {
            let Some(buffer_ref) = buffer.get_mut() else {
                log::warn!("Failed to get mutable buffer reference");
                return false;
            };

            let seq = self.frames_pushed.fetch_add(1, Ordering::Relaxed);
            let pts = seq * self.frame_duration_ns;
            buffer_ref.set_pts(gstreamer::ClockTime::from_nseconds(pts));
            buffer_ref.set_duration(gstreamer::ClockTime::from_nseconds(
                self.frame_duration_ns,
            ));

            let Ok(mut map) = buffer_ref.map_writable() else {
                log::warn!("Failed to map buffer for writing");
                return false;
            };
            map.as_mut_slice().copy_from_slice(&frame.data);
        }

        match self.appsrc.push_buffer(buffer) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Failed to push frame to appsrc: {}", e);
                false
            }
        }
    }
}

impl Drop for VideoPublisher {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("Error stopping publisher pipeline: {}", e);
        }
    }
}
