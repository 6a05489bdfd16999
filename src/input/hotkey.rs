//! Global hotkey registration
//!
//! The hotkey is registered through the system hotkey API rather than a raw
//! event tap on purpose. Hyper-key utilities rewrite a physical key into a
//! modifier chord *inside* the event pipeline: a CGEventTap sits early enough
//! to see the pre-remap hardware keycode, while the registration API observes
//! the corrected combination. A "hyper + D" binding therefore only works
//! through this layer.
//!
//! Presses toggle recording; releases are ignored.

use anyhow::{anyhow, Context, Result};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager,
};
use tracing::info;

use crate::config::HotkeyConfig;

/// Registered global hotkey
pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    hotkey: HotKey,
}

impl HotkeyManager {
    /// Create and register the global hotkey from config
    ///
    /// # Errors
    /// Returns error if the hotkey cannot be parsed or registered
    pub fn new(config: &HotkeyConfig) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("failed to create hotkey manager")?;

        let modifiers = Self::parse_modifiers(&config.modifiers)?;
        let code = Self::parse_key(&config.key)?;

        let hotkey = HotKey::new(Some(modifiers), code);
        manager
            .register(hotkey)
            .context("failed to register hotkey")?;

        info!("registered hotkey: {:?} + {}", config.modifiers, config.key);

        Ok(Self { manager, hotkey })
    }

    /// Whether this event is a press of our hotkey
    ///
    /// Releases return false: the toggle fires on key-down only, so holding
    /// the chord doesn't stop the recording it just started.
    pub fn is_toggle_press(&self, event: &GlobalHotKeyEvent) -> bool {
        event.id == self.hotkey.id()
            && matches!(event.state, global_hotkey::HotKeyState::Pressed)
    }

    fn parse_modifiers(modifiers: &[String]) -> Result<Modifiers> {
        let mut result = Modifiers::empty();
        for modifier in modifiers {
            match modifier.as_str() {
                "Control" | "Ctrl" => result |= Modifiers::CONTROL,
                "Option" | "Alt" => result |= Modifiers::ALT,
                "Command" | "Super" => result |= Modifiers::SUPER,
                "Shift" => result |= Modifiers::SHIFT,
                _ => return Err(anyhow!("unknown modifier: {}", modifier)),
            }
        }
        if result.is_empty() {
            return Err(anyhow!("at least one modifier is required"));
        }
        Ok(result)
    }

    fn parse_key(key: &str) -> Result<Code> {
        let normalized = key.to_ascii_uppercase();
        let code = match normalized.as_str() {
            "A" => Code::KeyA,
            "B" => Code::KeyB,
            "C" => Code::KeyC,
            "D" => Code::KeyD,
            "E" => Code::KeyE,
            "F" => Code::KeyF,
            "G" => Code::KeyG,
            "H" => Code::KeyH,
            "I" => Code::KeyI,
            "J" => Code::KeyJ,
            "K" => Code::KeyK,
            "L" => Code::KeyL,
            "M" => Code::KeyM,
            "N" => Code::KeyN,
            "O" => Code::KeyO,
            "P" => Code::KeyP,
            "Q" => Code::KeyQ,
            "R" => Code::KeyR,
            "S" => Code::KeyS,
            "T" => Code::KeyT,
            "U" => Code::KeyU,
            "V" => Code::KeyV,
            "W" => Code::KeyW,
            "X" => Code::KeyX,
            "Y" => Code::KeyY,
            "Z" => Code::KeyZ,
            "0" => Code::Digit0,
            "1" => Code::Digit1,
            "2" => Code::Digit2,
            "3" => Code::Digit3,
            "4" => Code::Digit4,
            "5" => Code::Digit5,
            "6" => Code::Digit6,
            "7" => Code::Digit7,
            "8" => Code::Digit8,
            "9" => Code::Digit9,
            _ => return Err(anyhow!("unsupported key: {}", key)),
        };
        Ok(code)
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        if let Err(e) = self.manager.unregister(self.hotkey) {
            tracing::error!("failed to unregister hotkey: {}", e);
        }
    }
}
