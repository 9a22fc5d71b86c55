use crate::display::VideoDisplay;
use crate::frame::RgbFrame;
use crate::subscribe::VideoSubscriber;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::time::Duration;
use tokio::sync::watch;

/// Inbound side of the transport, as seen by the receive loop.
pub trait FrameSource {
    /// Take the most recent frame, if one arrived. Must not block.
    fn get_frame(&mut self) -> Option<RgbFrame>;
    /// Tear down the transport.
    fn stop(&mut self) -> anyhow::Result<()>;
}

impl FrameSource for VideoSubscriber {
    fn get_frame(&mut self) -> Option<RgbFrame> {
        VideoSubscriber::get_frame(self)
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        VideoSubscriber::stop(self)?;
        Ok(())
    }
}

/// Where received frames end up.
pub trait FrameSink {
    fn show_frame(&mut self, frame: &RgbFrame) -> anyhow::Result<()>;
    fn close(&mut self) -> anyhow::Result<()>;
}

impl FrameSink for VideoDisplay {
    fn show_frame(&mut self, frame: &RgbFrame) -> anyhow::Result<()> {
        VideoDisplay::show_frame(self, frame)?;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        VideoDisplay::close(self)?;
        Ok(())
    }
}

/// Non-blocking keyboard poll.
pub trait KeyPoll {
    fn poll_key(&mut self) -> Option<KeyCode>;
}

/// Polls the terminal for key presses via crossterm.
///
/// The caller is expected to have raw mode enabled; without it key events
/// only arrive line-buffered.
pub struct TerminalKeys;

impl KeyPoll for TerminalKeys {
    fn poll_key(&mut self) -> Option<KeyCode> {
        match event::poll(Duration::ZERO) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(key.code),
                Ok(_) => None,
                Err(e) => {
                    log::error!("Failed to read key event: {}", e);
                    None
                }
            },
            Ok(false) => None,
            Err(e) => {
                log::error!("Failed to poll key events: {}", e);
                None
            }
        }
    }
}

/// What a single receive tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep the timer armed
    Continue,
    /// Stop the cooperative loop
    Stop,
}

/// One timer tick: pull the latest frame, show it, poll for Escape.
///
/// Per-tick errors are logged and treated as non-fatal; only the Escape
/// key stops the loop.
pub fn tick<S, D, K>(source: &mut S, display: &mut D, keys: &mut K) -> TickOutcome
where
    S: FrameSource,
    D: FrameSink,
    K: KeyPoll,
{
    if let Some(frame) = source.get_frame() {
        if let Err(e) = display.show_frame(&frame) {
            log::error!("Error displaying frame: {}", e);
        }
    }

    match keys.poll_key() {
        Some(KeyCode::Esc) => {
            log::info!("Escape pressed, stopping");
            TickOutcome::Stop
        }
        _ => TickOutcome::Continue,
    }
}

/// Receive and display frames on a fixed-interval tick until Escape is
/// pressed or a shutdown signal arrives.
///
/// On exit by any path, the source is stopped and the display closed, each
/// exactly once and each guarded so a failure in one does not skip the
/// other.
pub async fn run_recv_loop<S, D, K>(
    source: &mut S,
    display: &mut D,
    keys: &mut K,
    poll_fps: u32,
    shutdown_rx: &mut watch::Receiver<()>,
) where
    S: FrameSource,
    D: FrameSink,
    K: KeyPoll,
{
    let period = Duration::from_secs_f64(1.0 / poll_fps.max(1) as f64);
    let mut ticker = tokio::time::interval(period);

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                log::info!("Receive loop stopped by user");
                break;
            }

            _ = ticker.tick() => {
                if tick(source, display, keys) == TickOutcome::Stop {
                    break;
                }
            }
        }
    }

    if let Err(e) = source.stop() {
        log::error!("Error stopping subscriber: {}", e);
    }
    if let Err(e) = display.close() {
        log::error!("Error closing display: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::VecDeque;

    struct FakeSource {
        frames: VecDeque<RgbFrame>,
        stops: u32,
    }

    impl FakeSource {
        fn new(frames: Vec<RgbFrame>) -> Self {
            Self {
                frames: frames.into(),
                stops: 0,
            }
        }
    }

    impl FrameSource for FakeSource {
        fn get_frame(&mut self) -> Option<RgbFrame> {
            self.frames.pop_front()
        }

        fn stop(&mut self) -> anyhow::Result<()> {
            self.stops += 1;
            Ok(())
        }
    }

    struct FakeSink {
        shown: u32,
        closes: u32,
        fail_show: bool,
        fail_close: bool,
    }

    impl FakeSink {
        fn new() -> Self {
            Self {
                shown: 0,
                closes: 0,
                fail_show: false,
                fail_close: false,
            }
        }
    }

    impl FrameSink for FakeSink {
        fn show_frame(&mut self, _frame: &RgbFrame) -> anyhow::Result<()> {
            self.shown += 1;
            if self.fail_show {
                Err(anyhow!("sink failure"))
            } else {
                Ok(())
            }
        }

        fn close(&mut self) -> anyhow::Result<()> {
            self.closes += 1;
            if self.fail_close {
                Err(anyhow!("close failure"))
            } else {
                Ok(())
            }
        }
    }

    struct ScriptedKeys {
        keys: VecDeque<Option<KeyCode>>,
    }

    impl ScriptedKeys {
        fn new(keys: Vec<Option<KeyCode>>) -> Self {
            Self { keys: keys.into() }
        }
    }

    impl KeyPoll for ScriptedKeys {
        fn poll_key(&mut self) -> Option<KeyCode> {
            self.keys.pop_front().flatten()
        }
    }

    fn test_frame() -> RgbFrame {
        RgbFrame::filled(8, 8, [255, 255, 255])
    }

    #[test]
    fn test_tick_escape_stops() {
        let mut source = FakeSource::new(vec![test_frame()]);
        let mut sink = FakeSink::new();
        let mut keys = ScriptedKeys::new(vec![Some(KeyCode::Esc)]);

        assert_eq!(
            tick(&mut source, &mut sink, &mut keys),
            TickOutcome::Stop
        );
        assert_eq!(sink.shown, 1);
    }

    #[test]
    fn test_tick_other_key_continues() {
        let mut source = FakeSource::new(vec![test_frame()]);
        let mut sink = FakeSink::new();
        let mut keys = ScriptedKeys::new(vec![Some(KeyCode::Char('q'))]);

        assert_eq!(
            tick(&mut source, &mut sink, &mut keys),
            TickOutcome::Continue
        );
    }

    #[test]
    fn test_tick_no_frame_no_key_continues() {
        let mut source = FakeSource::new(vec![]);
        let mut sink = FakeSink::new();
        let mut keys = ScriptedKeys::new(vec![]);

        assert_eq!(
            tick(&mut source, &mut sink, &mut keys),
            TickOutcome::Continue
        );
        assert_eq!(sink.shown, 0);
    }

    #[test]
    fn test_tick_display_error_is_non_fatal() {
        let mut source = FakeSource::new(vec![test_frame()]);
        let mut sink = FakeSink::new();
        sink.fail_show = true;
        let mut keys = ScriptedKeys::new(vec![]);

        assert_eq!(
            tick(&mut source, &mut sink, &mut keys),
            TickOutcome::Continue
        );
        assert_eq!(sink.shown, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_loop_stops_on_escape_and_cleans_up_once() {
        let mut source = FakeSource::new(vec![test_frame(), test_frame()]);
        let mut sink = FakeSink::new();
        let mut keys = ScriptedKeys::new(vec![None, Some(KeyCode::Esc)]);
        let (_tx, mut rx) = watch::channel(());

        run_recv_loop(&mut source, &mut sink, &mut keys, 30, &mut rx).await;

        // Stopped on the second tick; both frames were shown first
        assert_eq!(sink.shown, 2);
        assert_eq!(source.stops, 1);
        assert_eq!(sink.closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_loop_stops_on_shutdown_signal() {
        let mut source = FakeSource::new(vec![]);
        let mut sink = FakeSink::new();
        let mut keys = ScriptedKeys::new(vec![]);
        let (tx, mut rx) = watch::channel(());
        tx.send(()).unwrap();

        run_recv_loop(&mut source, &mut sink, &mut keys, 30, &mut rx).await;

        assert_eq!(source.stops, 1);
        assert_eq!(sink.closes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_loop_close_failure_does_not_skip_stop() {
        let mut source = FakeSource::new(vec![]);
        let mut sink = FakeSink::new();
        sink.fail_close = true;
        let mut keys = ScriptedKeys::new(vec![Some(KeyCode::Esc)]);
        let (_tx, mut rx) = watch::channel(());

        run_recv_loop(&mut source, &mut sink, &mut keys, 30, &mut rx).await;

        assert_eq!(source.stops, 1);
        assert_eq!(sink.closes, 1);
    }
}
