use std::sync::{Arc, Mutex};
use std::time::Duration;

use prism::capture::{self, CaptureState, Frame, FrameSource, SyntheticSource};
use prism::display::DisplaySink;
use prism::filter::{self, FilterEngine, FilterSelector};
use prism::pipeline::ScheduleState;
use prism::{Config, FrameScheduler};
use tokio::time::{sleep, Instant};

const PERIOD: Duration = Duration::from_nanos(33_333_333);

/// Synthetic camera that keeps a copy of every raw frame it hands out.
struct RecordingSource {
    inner: SyntheticSource,
    captured: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingSource {
    fn new(device: &str) -> (Self, Arc<Mutex<Vec<Frame>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let source = Self {
            inner: SyntheticSource::new(device, 16, 12),
            captured: captured.clone(),
        };
        (source, captured)
    }
}

impl FrameSource for RecordingSource {
    fn open(&mut self) -> capture::source::Result<()> {
        self.inner.open()
    }

    fn read(&mut self) -> Option<Frame> {
        let frame = self.inner.read()?;
        self.captured.lock().unwrap().push(frame.clone());
        Some(frame)
    }

    fn release(&mut self) {
        self.inner.release()
    }

    fn state(&self) -> CaptureState {
        self.inner.state()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

type Presented = Arc<Mutex<Vec<(Instant, Frame)>>>;

struct RecordingSink {
    presented: Presented,
}

impl RecordingSink {
    fn new() -> (Self, Presented) {
        let presented = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                presented: presented.clone(),
            },
            presented,
        )
    }
}

impl DisplaySink for RecordingSink {
    fn present(&mut self, frame: Frame) {
        self.presented.lock().unwrap().push((Instant::now(), frame));
    }
}

fn expected(raw: &Frame, selector: FilterSelector) -> Frame {
    filter::to_display(&filter::apply(raw, selector))
}

#[tokio::test(start_paused = true)]
async fn five_sepia_ticks_at_the_configured_period() {
    let (source, captured) = RecordingSource::new("stub://cam");
    let (sink, presented) = RecordingSink::new();
    let scheduler =
        FrameScheduler::new(source, sink, FilterEngine::new(FilterSelector::Sepia), PERIOD);
    let (controls, commands) = scheduler.control_channel();
    let tick_loop = tokio::spawn(scheduler.run(commands));

    let started = Instant::now();
    controls.start();
    sleep(PERIOD * 5 + PERIOD / 2).await;
    controls.stop();
    controls.shutdown();
    let source = tick_loop.await.unwrap();

    let presented = presented.lock().unwrap();
    let captured = captured.lock().unwrap();
    assert_eq!(presented.len(), 5);
    assert_eq!(captured.len(), 5);

    let tolerance = Duration::from_millis(1);
    let mut previous = started;
    for ((at, shown), raw) in presented.iter().zip(captured.iter()) {
        let gap = *at - previous;
        assert!(
            gap + tolerance >= PERIOD && gap <= PERIOD + tolerance,
            "tick gap {:?}",
            gap
        );
        previous = *at;

        assert_eq!(shown.meta.sequence, raw.meta.sequence);
        assert_eq!(shown.data, expected(raw, FilterSelector::Sepia).data);
    }

    assert_eq!(source.state(), CaptureState::Closed);
}

#[tokio::test(start_paused = true)]
async fn filter_change_applies_from_the_next_tick() {
    let (source, captured) = RecordingSource::new("stub://cam");
    let (sink, presented) = RecordingSink::new();
    let scheduler = FrameScheduler::new(source, sink, FilterEngine::default(), PERIOD);
    let (controls, commands) = scheduler.control_channel();
    let tick_loop = tokio::spawn(scheduler.run(commands));

    controls.start();
    sleep(PERIOD * 2 + PERIOD / 2).await;
    controls.select_by_name("invert");
    sleep(PERIOD * 2).await;
    controls.shutdown();
    tick_loop.await.unwrap();

    let presented = presented.lock().unwrap();
    let captured = captured.lock().unwrap();
    assert_eq!(presented.len(), 4);

    let used = [
        FilterSelector::None,
        FilterSelector::None,
        FilterSelector::Invert,
        FilterSelector::Invert,
    ];
    for (((_, shown), raw), selector) in presented.iter().zip(captured.iter()).zip(used) {
        assert_eq!(shown.data, expected(raw, selector).data, "{selector}");
    }
}

#[tokio::test(start_paused = true)]
async fn missing_camera_keeps_the_loop_inert() {
    let (source, captured) = RecordingSource::new("stub://absent");
    let (sink, presented) = RecordingSink::new();
    let scheduler = FrameScheduler::new(source, sink, FilterEngine::default(), PERIOD);
    let stats = scheduler.stats();
    let (controls, commands) = scheduler.control_channel();
    let tick_loop = tokio::spawn(scheduler.run(commands));

    controls.start();
    sleep(PERIOD * 4 + PERIOD / 2).await;
    controls.stop();
    controls.stop();
    controls.shutdown();
    let source = tick_loop.await.unwrap();

    assert!(presented.lock().unwrap().is_empty());
    assert!(captured.lock().unwrap().is_empty());
    assert_eq!(source.inner.reads_attempted(), 0);
    assert_eq!(stats.snapshot().inert, 4);
    assert_eq!(source.state(), CaptureState::Closed);
}

#[tokio::test(start_paused = true)]
async fn stopped_loop_delivers_nothing_until_restarted() {
    let (source, _captured) = RecordingSource::new("stub://cam");
    let (sink, presented) = RecordingSink::new();
    let scheduler = FrameScheduler::new(source, sink, FilterEngine::default(), PERIOD);
    let (controls, commands) = scheduler.control_channel();
    let tick_loop = tokio::spawn(scheduler.run(commands));

    controls.start();
    sleep(PERIOD + PERIOD / 2).await;
    controls.stop();
    sleep(PERIOD * 5).await;
    assert_eq!(presented.lock().unwrap().len(), 1);

    controls.start();
    sleep(PERIOD + PERIOD / 2).await;
    controls.shutdown();
    tick_loop.await.unwrap();

    assert_eq!(presented.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_shuts_down_and_releases() {
    let (source, _captured) = RecordingSource::new("stub://cam");
    let (sink, _presented) = RecordingSink::new();
    let scheduler = FrameScheduler::new(source, sink, FilterEngine::default(), PERIOD);
    let (controls, commands) = scheduler.control_channel();
    let tick_loop = tokio::spawn(scheduler.run(commands));

    controls.start();
    sleep(PERIOD * 2).await;
    drop(controls);

    let source = tick_loop.await.unwrap();
    assert_eq!(source.state(), CaptureState::Closed);
}

#[test]
fn configured_scheduler_uses_initial_filter_and_fps() {
    let config = Config::from_toml(
        "[capture]\ndevice = \"stub://cam\"\nfps = 20\n[pipeline]\ninitial_filter = \"edge\"\n",
    )
    .unwrap();
    let source = capture::build_source(&config.capture);
    let (sink, _presented) = RecordingSink::new();
    let mut scheduler = FrameScheduler::from_config(source, sink, &config);

    assert_eq!(scheduler.period(), Duration::from_millis(50));
    assert_eq!(scheduler.engine().selected(), FilterSelector::Edge);
    assert_eq!(scheduler.state(), ScheduleState::Stopped);

    scheduler.start();
    assert_eq!(scheduler.capture_state(), CaptureState::Available);
    scheduler.release();
    scheduler.release();
    assert_eq!(scheduler.capture_state(), CaptureState::Closed);
}
