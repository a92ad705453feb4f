//! Event loop integration
//!
//! Wraps calloop and owns the frame timers that drive per-output
//! rendering. Everything dispatches sequentially on this loop; nothing in
//! the engine blocks it.

use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop as CalLoop, LoopHandle, LoopSignal};
use log::{debug, error};

/// The compositor event loop
pub struct EventLoop<Data: 'static> {
    event_loop: CalLoop<'static, Data>,
    signal: LoopSignal,
}

impl<Data> EventLoop<Data> {
    /// Create a new event loop
    pub fn new() -> anyhow::Result<Self> {
        let event_loop = CalLoop::try_new()?;
        let signal = event_loop.get_signal();
        Ok(Self { event_loop, signal })
    }

    /// Get a handle to register event sources
    pub fn handle(&self) -> LoopHandle<'static, Data> {
        self.event_loop.handle()
    }

    /// Get the loop signal for waking/stopping
    pub fn signal(&self) -> LoopSignal {
        self.signal.clone()
    }

    /// Register a repeating frame timer. The callback runs once per
    /// `interval` until the loop stops; it stands in for the output's
    /// frame-done signal.
    pub fn add_frame_timer<F>(&self, interval: Duration, mut callback: F) -> anyhow::Result<()>
    where
        F: FnMut(&mut Data) + 'static,
    {
        self.handle()
            .insert_source(Timer::from_duration(interval), move |_, _, data| {
                callback(data);
                TimeoutAction::ToDuration(interval)
            })
            .map_err(|e| anyhow::anyhow!("failed to register frame timer: {}", e))?;
        Ok(())
    }

    /// Run one iteration of the event loop
    pub fn dispatch(&mut self, timeout: Option<Duration>, data: &mut Data) -> anyhow::Result<()> {
        self.event_loop.dispatch(timeout, data)?;
        Ok(())
    }

    /// Run the event loop until stopped
    pub fn run(&mut self, data: &mut Data) -> anyhow::Result<()> {
        debug!("starting event loop");
        loop {
            if let Err(e) = self.dispatch(None, data) {
                error!("event loop error: {}", e);
                return Err(e);
            }
        }
    }

    /// Stop the event loop
    pub fn stop(&self) {
        self.signal.stop();
    }

    /// Wake the event loop
    pub fn wake(&self) {
        self.signal.wakeup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_event_loop_new() {
        let event_loop: anyhow::Result<EventLoop<()>> = EventLoop::new();
        assert!(event_loop.is_ok());
    }

    #[test]
    fn test_event_loop_dispatch() {
        let mut event_loop: EventLoop<()> = EventLoop::new().unwrap();
        let result = event_loop.dispatch(Some(Duration::ZERO), &mut ());
        assert!(result.is_ok());
    }

    #[test]
    fn test_frame_timer_fires() {
        let mut event_loop: EventLoop<u32> = EventLoop::new().unwrap();
        event_loop
            .add_frame_timer(Duration::from_millis(1), |ticks| *ticks += 1)
            .unwrap();

        let mut ticks = 0u32;
        let deadline = Instant::now() + Duration::from_secs(5);
        while ticks == 0 && Instant::now() < deadline {
            event_loop
                .dispatch(Some(Duration::from_millis(20)), &mut ticks)
                .unwrap();
        }
        assert!(ticks > 0, "frame timer never fired");
    }
}
