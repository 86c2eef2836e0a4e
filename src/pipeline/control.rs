use flume::Sender;
use tracing::{debug, warn};

use crate::filter::{FilterEngine, FilterSelector};

/// Requests the tick loop handles between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    /// Leave the loop and release the capture device.
    Shutdown,
}

/// Entry points for the control surface.
///
/// Start and stop are queued to the tick loop; filter selection writes the
/// shared selector directly and is picked up by the next tick. Nothing here
/// reports failure to the caller: a gone tick loop is logged and ignored.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    commands: Sender<Command>,
    engine: FilterEngine,
}

impl ControlHandle {
    pub(crate) fn new(commands: Sender<Command>, engine: FilterEngine) -> Self {
        Self { commands, engine }
    }

    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    pub fn select_filter(&self, selector: FilterSelector) {
        debug!("Filter selected: {}", selector.label());
        self.engine.select(selector);
    }

    /// Select by wire name; unknown names select no filter.
    pub fn select_by_name(&self, name: &str) {
        self.select_filter(FilterSelector::from_name(name));
    }

    pub fn selected(&self) -> FilterSelector {
        self.engine.selected()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("Tick loop is gone, ignoring {:?}", command);
        }
    }
}
