use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use image::RgbImage;
use minifb::{InputCallback, Window, WindowOptions};

use crate::command::Command;
use crate::error::Result;

/// Where frames are shown to the operator, and where commands come from.
pub trait Display {
    fn show(&mut self, frame: &RgbImage) -> Result<()>;

    /// Waits up to `timeout` and returns the first pending command, if any. Further keys pressed
    /// in the same window are dropped.
    fn poll_command(&mut self, timeout: Duration) -> Option<Command>;

    /// Must be safe to call more than once.
    fn close(&mut self);
}

/// Characters typed into the window, in the order they arrived.
///
/// Clones share the same queue: one is handed to minifb as its input callback, the other stays
/// with the display and is drained once per poll.
#[derive(Debug, Clone, Default)]
pub struct KeyQueue(Rc<RefCell<VecDeque<char>>>);

impl KeyQueue {
    pub fn push(&self, key: char) {
        self.0.borrow_mut().push_back(key);
    }

    /// Returns the earliest key that decodes to a command and drops everything else queued.
    pub fn take_command(&self) -> Option<Command> {
        self.0.borrow_mut().drain(..).find_map(Command::from_key)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl InputCallback for KeyQueue {
    fn add_char(&mut self, uni_char: u32) {
        if let Some(key) = char::from_u32(uni_char) {
            self.push(key);
        }
    }
}

pub struct WindowDisplay {
    window: Option<Window>,
    buffer: Vec<u32>,
    keys: KeyQueue,
}

impl WindowDisplay {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(title, width, height, WindowOptions::default())?;

        let keys = KeyQueue::default();
        window.set_input_callback(Box::new(keys.clone()));

        Ok(Self {
            window: Some(window),
            buffer: vec![0; width * height],
            keys,
        })
    }
}

impl Display for WindowDisplay {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        let Some(window) = self.window.as_mut() else {
            return Ok(());
        };

        let (width, height) = (frame.width() as usize, frame.height() as usize);
        self.buffer.resize(width * height, 0);

        // RGB8 -> 0RGB u32
        for (out, pixel) in self.buffer.iter_mut().zip(frame.pixels()) {
            let [r, g, b] = pixel.0;
            *out = (r as u32) << 16 | (g as u32) << 8 | b as u32;
        }

        window.update_with_buffer(&self.buffer, width, height)?;
        Ok(())
    }

    fn poll_command(&mut self, timeout: Duration) -> Option<Command> {
        let window = self.window.as_mut()?;

        std::thread::sleep(timeout);
        window.update();

        // the window manager closing the window counts as quitting
        if !window.is_open() {
            return Some(Command::Quit);
        }

        // typed during this wait or while the last frame was being processed
        self.keys.take_command()
    }

    fn close(&mut self) {
        if self.window.take().is_some() {
            log::debug!("window closed");
        }
    }
}

impl Drop for WindowDisplay {
    fn drop(&mut self) {
        self.close();
    }
}
