//! Keyboard latch: the single last-key-pressed register read at $C000 and
//! cleared at $C010, plus the Open-/Solid-Apple modifier keys which are
//! surfaced directly as [`SoftSwitches`](crate::softswitches::SoftSwitches)
//! fields rather than through this latch.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyboard {
    /// Bits 6-0 are the ASCII code of the last key pressed; the available
    /// bit is tracked separately in `strobe`. Power-on value is `0x8D`
    /// (carriage return, available) per the source's reset.
    last_key_code: u8,
    strobe: bool,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self {
            last_key_code: 0x0D,
            strobe: true,
        }
    }
}

impl Keyboard {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Latches `ascii` and raises the strobe. Called on a host key-press
    /// event; `ascii` is expected pre-mapped to the Apple II's character set
    /// (high bit clear).
    pub fn key_down(&mut self, ascii: u8) {
        self.last_key_code = ascii & 0x7F;
        self.strobe = true;
    }

    /// Key-up is a no-op on the latch itself: the Apple //e keyboard encoder
    /// only ever reports the most recent key-down, and releasing a key does
    /// not retract it.
    pub fn key_up(&mut self, _ascii: u8) {}

    pub fn clear_strobe(&mut self) {
        self.strobe = false;
    }

    /// The raw $C000 register value: strobe in bit 7, ASCII code in bits 6-0.
    pub fn latch(&self) -> u8 {
        ((self.strobe as u8) << 7) | (self.last_key_code & 0x7F)
    }

    pub fn any_key_down_flag(&self) -> u8 {
        (self.strobe as u8) << 7
    }
}
