//! SDL2 Window Display Module
//! Shows processed frames and doubles as the keyboard control surface.
//!
//! Keys: `S` start, `X`/`Space` stop, `1`..`9` pick a filter, `Esc` quits.

use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use flume::{Receiver, RecvTimeoutError};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use tracing::{info, warn};

use crate::capture::{Frame, PixelFormat};
use crate::filter::FilterSelector;
use crate::pipeline::{ControlHandle, TickStats};
use crate::DisplayConfig;

/// Number keys in catalog order.
const FILTER_KEYS: [Keycode; 9] = [
    Keycode::Num1,
    Keycode::Num2,
    Keycode::Num3,
    Keycode::Num4,
    Keycode::Num5,
    Keycode::Num6,
    Keycode::Num7,
    Keycode::Num8,
    Keycode::Num9,
];

/// How long to wait for a frame before polling events again.
const FRAME_WAIT: Duration = Duration::from_millis(16);

/// SDL2 Window Display
pub struct Sdl2Display {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
    title: String,
}

impl Sdl2Display {
    pub fn new(sdl_context: &sdl2::Sdl, config: &DisplayConfig) -> Result<Self> {
        let video_subsystem = sdl_context.video().map_err(|e| eyre!(e))?;

        let window = video_subsystem
            .window(&config.title, config.width, config.height)
            .position_centered()
            .resizable()
            .build()?;

        let canvas = window.into_canvas().present_vsync().build()?;
        let texture_creator = canvas.texture_creator();

        info!("Display window {}x{} ready", config.width, config.height);
        for (key, selector) in FILTER_KEYS.iter().zip(FilterSelector::ALL) {
            info!("  {} -> {}", key.name(), selector.label());
        }

        Ok(Self {
            canvas,
            texture_creator,
            title: config.title.clone(),
        })
    }

    /// Draw an RGB24 frame whose rows arrive bottom first.
    pub fn render_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.format() != PixelFormat::Rgb24 {
            return Err(eyre!("display expects RGB24, got {:?}", frame.format()));
        }

        let mut texture = self
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, frame.width(), frame.height())
            .map_err(|e| eyre!(e))?;

        texture
            .update(None, &frame.data, frame.meta.stride as usize)
            .map_err(|e| eyre!(e))?;

        self.canvas.clear();
        // Rows are bottom-up; SDL draws top-down
        self.canvas
            .copy_ex(&texture, None, None, 0.0, None, false, true)
            .map_err(|e| eyre!(e))?;

        self.canvas.present();
        Ok(())
    }

    fn update_title(&mut self, selected: FilterSelector, stats: &TickStats) {
        let title = format!(
            "{} - {} - {} frames",
            self.title,
            selected.label(),
            stats.presented()
        );
        if let Err(e) = self.canvas.window_mut().set_title(&title) {
            warn!("Failed to set window title: {}", e);
        }
    }

    /// Run the window until it is closed, forwarding key presses to `controls`.
    pub fn run(
        &mut self,
        sdl_context: &sdl2::Sdl,
        rx: Receiver<Frame>,
        controls: &ControlHandle,
        stats: &TickStats,
    ) -> Result<()> {
        let mut event_pump = sdl_context.event_pump().map_err(|e| eyre!(e))?;
        self.update_title(controls.selected(), stats);

        'running: loop {
            for event in event_pump.poll_iter() {
                match event {
                    Event::Quit { .. }
                    | Event::KeyDown {
                        keycode: Some(Keycode::Escape),
                        ..
                    } => {
                        info!("Quit event received");
                        break 'running;
                    }
                    Event::KeyDown {
                        keycode: Some(key), ..
                    } => self.handle_key(key, controls),
                    _ => {}
                }
            }

            match rx.recv_timeout(FRAME_WAIT) {
                Ok(frame) => {
                    self.render_frame(&frame)?;
                    self.update_title(controls.selected(), stats);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Frame stream closed");
                    break 'running;
                }
            }
        }

        Ok(())
    }

    fn handle_key(&self, key: Keycode, controls: &ControlHandle) {
        if key == Keycode::S {
            controls.start();
        } else if key == Keycode::X || key == Keycode::Space {
            controls.stop();
        } else if let Some(index) = FILTER_KEYS.iter().position(|k| *k == key) {
            controls.select_filter(FilterSelector::ALL[index]);
        }
    }
}
