/// An operator command, decoded from a key press at the display boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Write the current overlaid frame to `data/`.
    Capture,
    /// Write the current landmarks to `landmarks/`.
    SaveLandmarks,
    Quit,
}

impl Command {
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'c' => Some(Command::Capture),
            's' => Some(Command::SaveLandmarks),
            'q' => Some(Command::Quit),
            _ => None,
        }
    }
}

pub const HELP: &str = "Press 'C' to capture image, 'S' to save landmarks, 'Q' to quit.";
