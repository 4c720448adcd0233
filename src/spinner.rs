//! Spinner animation frames for CLI progress indicators

/// Spinner animation frames (braille-style dots)
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner frames as a string (for indicatif ProgressBar)
pub fn spinner_chars() -> String {
    SPINNER_FRAMES.concat()
}
