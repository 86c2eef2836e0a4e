//! Fixed-cadence capture, filter and present loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::Receiver;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::capture::{CaptureState, FrameSource};
use crate::display::DisplaySink;
use crate::filter::{self, FilterEngine, FilterSelector};
use crate::pipeline::control::{Command, ControlHandle};
use crate::pipeline::stats::TickStats;
use crate::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Stopped,
    Running,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stopped, or the device is not available.
    Inert,
    /// The device delivered no frame this time.
    Skipped,
    Presented {
        sequence: u64,
        filter: FilterSelector,
    },
}

/// Drives the capture device at a fixed period and hands filtered frames
/// to the display.
///
/// Each tick runs to completion before the next one can fire, so a slow
/// filter delays the next capture instead of overlapping it. Only one frame
/// is in flight at a time.
pub struct FrameScheduler<S, D> {
    source: S,
    sink: D,
    engine: FilterEngine,
    state: ScheduleState,
    period: Duration,
    stats: Arc<TickStats>,
}

impl<S: FrameSource, D: DisplaySink> FrameScheduler<S, D> {
    pub fn new(source: S, sink: D, engine: FilterEngine, period: Duration) -> Self {
        Self {
            source,
            sink,
            engine,
            state: ScheduleState::Stopped,
            period,
            stats: Arc::new(TickStats::new()),
        }
    }

    pub fn from_config(source: S, sink: D, config: &Config) -> Self {
        let engine = FilterEngine::new(config.pipeline.initial_filter);
        Self::new(source, sink, engine, config.tick_period())
    }

    /// Control surface handle plus the command stream for [`Self::run`].
    pub fn control_channel(&self) -> (ControlHandle, Receiver<Command>) {
        let (tx, rx) = flume::unbounded();
        (ControlHandle::new(tx, self.engine.clone()), rx)
    }

    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    pub fn stats(&self) -> Arc<TickStats> {
        self.stats.clone()
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ScheduleState::Running
    }

    pub fn capture_state(&self) -> CaptureState {
        self.source.state()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Open the device if needed and begin ticking.
    ///
    /// A failed open is logged and leaves the scheduler running but inert;
    /// a later `start()` retries the device.
    pub fn start(&mut self) {
        if self.source.state() != CaptureState::Available {
            match self.source.open() {
                Ok(()) => info!("Camera opened: {}", self.source.describe()),
                Err(e) => warn!("Could not open camera: {}", e),
            }
        }

        if self.state == ScheduleState::Running {
            return;
        }
        self.state = ScheduleState::Running;
        info!("Capture started at {:?} per frame", self.period);
    }

    /// Stop delivering ticks. The device stays open.
    pub fn stop(&mut self) {
        if self.state == ScheduleState::Stopped {
            return;
        }
        self.state = ScheduleState::Stopped;
        info!("Capture stopped");
    }

    /// Takes effect from the next tick.
    pub fn select_filter(&self, selector: FilterSelector) {
        self.engine.select(selector);
    }

    /// Release the capture device regardless of schedule state.
    pub fn release(&mut self) {
        self.source.release();
    }

    /// One capture, filter, convert and present cycle.
    pub fn tick(&mut self) -> TickOutcome {
        self.stats.record_tick();

        if self.state != ScheduleState::Running
            || self.source.state() != CaptureState::Available
        {
            self.stats.record_inert();
            return TickOutcome::Inert;
        }

        let started = Instant::now();
        let Some(raw) = self.source.read() else {
            trace!("No frame this tick");
            self.stats.record_skipped_read();
            metrics::counter!("frame_reads_skipped").increment(1);
            return TickOutcome::Skipped;
        };

        let (filter, processed) = self.engine.process(&raw);
        let frame = filter::to_display(&processed);
        let sequence = frame.meta.sequence;
        self.sink.present(frame);

        self.stats.record_presented();
        metrics::counter!("frames_presented").increment(1);
        metrics::histogram!("tick_process_time_us").record(started.elapsed().as_micros() as f64);

        TickOutcome::Presented { sequence, filter }
    }

    /// Serve control commands and fire ticks until shut down.
    ///
    /// Returns the source after releasing it exactly once. Dropping every
    /// [`ControlHandle`] counts as a shutdown.
    pub async fn run(mut self, commands: Receiver<Command>) -> S {
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Tick loop ready on {}", self.source.describe());

        loop {
            tokio::select! {
                biased;

                command = commands.recv_async() => match command {
                    Ok(Command::Start) => {
                        let was_running = self.is_running();
                        self.start();
                        if !was_running {
                            ticker.reset();
                        }
                    }
                    Ok(Command::Stop) => self.stop(),
                    Ok(Command::Shutdown) | Err(_) => break,
                },

                _ = ticker.tick(), if self.is_running() => {
                    if let TickOutcome::Presented { sequence, filter } = self.tick() {
                        debug!("Presented frame {} with {}", sequence, filter);
                    }
                }
            }
        }

        info!("Tick loop shutting down");
        self.source.release();
        self.source
    }
}
