/// CGEvent-based typing, erasing, and the paste keystroke
pub mod cgevent;
/// Clipboard snapshot/paste/restore
pub mod clipboard;
/// Global hotkey registration and matching
pub mod hotkey;

pub use hotkey::HotkeyManager;
