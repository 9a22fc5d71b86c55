use crate::config::VideoConfig;
use crate::frame::{FrameGenerator, RgbFrame};
use crate::publish::VideoPublisher;
use std::time::Duration;
use tokio::sync::watch;

/// Outbound side of the transport, as seen by the send loop.
///
/// [`VideoPublisher`] is the production implementation; tests substitute
/// fakes.
pub trait FrameTransport {
    /// Submit one frame; false means the frame was dropped.
    fn publish_frame(&mut self, frame: &RgbFrame) -> bool;
    /// Whether the transport still accepts frames.
    fn is_running(&self) -> bool;
    /// Tear down the transport.
    fn stop(&mut self) -> anyhow::Result<()>;
}

impl FrameTransport for VideoPublisher {
    fn publish_frame(&mut self, frame: &RgbFrame) -> bool {
        VideoPublisher::publish_frame(self, frame)
    }

    fn is_running(&self) -> bool {
        VideoPublisher::is_running(self)
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        VideoPublisher::stop(self)?;
        Ok(())
    }
}

/// Counter values 1,2,...,100,1,... (wraps after 100)
pub struct CounterCycle {
    next: u32,
}

impl CounterCycle {
    pub fn new() -> Self {
        Self { next: 1 }
    }
}

impl Default for CounterCycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for CounterCycle {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let current = self.next;
        self.next = current % 100 + 1;
        Some(current)
    }
}

/// Generate and publish numbered frames at the configured rate until the
/// transport stops accepting frames or a shutdown signal arrives.
///
/// A dropped frame is logged and does not end the loop. The transport is
/// stopped exactly once on the way out, with any stop failure logged but
/// not propagated.
pub async fn run_send_loop<T: FrameTransport>(
    transport: &mut T,
    generator: &FrameGenerator,
    video: &VideoConfig,
    shutdown_rx: &mut watch::Receiver<()>,
) {
    let period = Duration::from_secs_f64(1.0 / video.fps.max(1) as f64);
    let mut ticker = tokio::time::interval(period);
    let mut counters = CounterCycle::new();

    while transport.is_running() {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                log::info!("Send loop stopped by user");
                break;
            }

            _ = ticker.tick() => {
                let number = counters.next().unwrap_or(1);
                let frame = generator.generate(number as i64, video.width, video.height);
                if !transport.publish_frame(&frame) {
                    log::warn!("Failed to publish frame {}", number);
                }
            }
        }
    }

    if let Err(e) = transport.stop() {
        log::error!("Error stopping transport: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTransport {
        published: u32,
        limit: u32,
        accept: bool,
        stops: u32,
    }

    impl FakeTransport {
        fn new(limit: u32) -> Self {
            Self {
                published: 0,
                limit,
                accept: true,
                stops: 0,
            }
        }
    }

    impl FrameTransport for FakeTransport {
        fn publish_frame(&mut self, _frame: &RgbFrame) -> bool {
            self.published += 1;
            self.accept
        }

        fn is_running(&self) -> bool {
            self.published < self.limit
        }

        fn stop(&mut self) -> anyhow::Result<()> {
            self.stops += 1;
            Ok(())
        }
    }

    fn small_video() -> VideoConfig {
        VideoConfig {
            width: 64,
            height: 48,
            fps: 30,
        }
    }

    #[test]
    fn test_counter_cycle_wraps_at_100() {
        let values: Vec<u32> = CounterCycle::new().take(150).collect();
        let expected: Vec<u32> = (1..=100).chain(1..=50).collect();
        assert_eq!(values, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_loop_runs_until_transport_stops() {
        let mut transport = FakeTransport::new(10);
        let generator = FrameGenerator::new().unwrap();
        let (_tx, mut rx) = watch::channel(());

        run_send_loop(&mut transport, &generator, &small_video(), &mut rx).await;

        assert_eq!(transport.published, 10);
        assert_eq!(transport.stops, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_loop_survives_publish_failures() {
        let mut transport = FakeTransport::new(5);
        transport.accept = false;
        let generator = FrameGenerator::new().unwrap();
        let (_tx, mut rx) = watch::channel(());

        run_send_loop(&mut transport, &generator, &small_video(), &mut rx).await;

        // Every iteration failed to publish, yet the loop kept going until
        // the transport itself stopped.
        assert_eq!(transport.published, 5);
        assert_eq!(transport.stops, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_loop_stops_on_shutdown_signal() {
        let mut transport = FakeTransport::new(u32::MAX);
        let generator = FrameGenerator::new().unwrap();
        let (tx, mut rx) = watch::channel(());
        tx.send(()).unwrap();

        run_send_loop(&mut transport, &generator, &small_video(), &mut rx).await;

        assert_eq!(transport.stops, 1);
    }
}
