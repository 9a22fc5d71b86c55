use crate::config::DisplaySink;
use crate::frame::RgbFrame;
use gstreamer::prelude::*;
use std::sync::atomic::Ordering;
use thiserror::Error;

/// Errors that can occur in the display pipeline
#[derive(Debug, Error)]
pub enum DisplayError {
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
    #[error("Failed to build caps: {0}")]
    CapsError(String),
    #[error("Failed to push frame to display")]
    PushError,
}

/// Shows raw RGB frames in a window.
///
/// Pipeline: `appsrc -> videoconvert -> <sink>` where the sink element is
/// chosen by [`DisplaySink`]. Caps are set lazily from the first frame and
/// renegotiated if the stream geometry changes.
pub struct VideoDisplay {
    pipeline: gstreamer::Pipeline,
    appsrc: gstreamer_app::AppSrc,
    dims: Option<(u32, u32)>,
    closed: bool,
}

impl VideoDisplay {
    pub fn new(sink: DisplaySink) -> Result<Self, DisplayError> {
        if !gstreamer::INITIALIZED.load(Ordering::Relaxed) {
            gstreamer::init()?;
        }

        let pipeline_desc = format!(
            "appsrc name=src is-live=true format=time do-timestamp=true ! \
             videoconvert ! \
             {} sync=false",
            sink.element_name()
        );

        log::debug!("Creating display pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| DisplayError::DowncastError)?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or(DisplayError::ElementNotFound)?
            .dynamic_cast::<gstreamer_app::AppSrc>()
            .map_err(|_| DisplayError::DowncastError)?;

        appsrc.set_format(gstreamer::Format::Time);
        appsrc.set_is_live(true);
        appsrc.set_stream_type(gstreamer_app::AppStreamType::Stream);

        pipeline.set_state(gstreamer::State::Playing)?;

        log::info!("Display window started ({})", sink.element_name());

        Ok(Self {
            pipeline,
            appsrc,
            dims: None,
            closed: false,
        })
    }

    /// Push one frame to the window.
    pub fn show_frame(&mut self, frame: &RgbFrame) -> Result<(), DisplayError> {
        if self.dims != Some((frame.width, frame.height)) {
            let info = gstreamer_video::VideoInfo::builder(
                gstreamer_video::VideoFormat::Rgb,
                frame.width,
                frame.height,
            )
            .build()
            .map_err(|e| DisplayError::CapsError(e.to_string()))?;
            let caps = info
                .to_caps()
                .map_err(|e| DisplayError::CapsError(e.to_string()))?;
            self.appsrc.set_caps(Some(&caps));
            self.dims = Some((frame.width, frame.height));
        }

        let mut buffer = gstreamer::Buffer::with_size(frame.data.len())
            .map_err(|_| DisplayError::BufferError)?;

        {
            let buffer_ref = buffer.get_mut().ok_or(DisplayError::BufferError)?;
            let mut map = buffer_ref
                .map_writable()
                .map_err(|_| DisplayError::BufferError)?;
            map.as_mut_slice().copy_from_slice(&frame.data);
        }

        self.appsrc
            .push_buffer(buffer)
            .map_err(|_| DisplayError::PushError)?;

        Ok(())
    }

    /// Tear down the window. Safe to call more than once.
    pub fn close(&mut self) -> Result<(), DisplayError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.appsrc.end_of_stream().ok();
        self.pipeline.set_state(gstreamer::State::Null)?;
        log::info!("Display window closed");
        Ok(())
    }
}

impl Drop for VideoDisplay {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("Error closing display window: {}", e);
        }
    }
}
