//! The $C000-$C0FF soft-switch page: the I/O dispatcher that reads and
//! writes [`SoftSwitches`] flags and delegates the $C0E0-$C0FF/$C0F0-$C0FF
//! windows to the FDC/HDC peripherals.
//!
//! Every address in this page is handled here, never by the MMU. Ranges
//! with no defined read semantics (most write-only switches, and the
//! $C020-2F/$C030-3F/$C0A0-AF/$C0C0-CF cassette/speaker/unoccupied-slot
//! windows) return `None` from [`dispatch_read`] to signal a floating data
//! bus, matching the real machine's behavior of leaving the last value
//! driven on the bus.

use log::trace;

use crate::bus::BusMember;
use crate::fdc::FloppyController;
use crate::hdc::HardDiskController;
use crate::keyboard::Keyboard;
use crate::softswitches::SoftSwitches;

pub struct IoContext<'a> {
    pub switches: &'a mut SoftSwitches,
    pub keyboard: &'a mut Keyboard,
    pub fdc: &'a mut dyn FloppyController,
    pub hdc: &'a mut dyn HardDiskController,
    /// The main RAM plane, lent to the HDC for DMA block transfers.
    pub ram: &'a mut [u8],
    pub speaker_toggled: &'a mut bool,
}

pub fn dispatch_read(addr: u16, ctx: &mut IoContext<'_>) -> Option<u8> {
    debug_assert!((0xC000..=0xC0FF).contains(&addr));
    let sw = &mut *ctx.switches;
    match addr {
        0xC000..=0xC00F => Some(ctx.keyboard.latch()),
        0xC010 => {
            let val = ctx.keyboard.latch();
            ctx.keyboard.clear_strobe();
            Some(val)
        }
        0xC011 => Some(flag_byte(sw.lcbnk2)),
        0xC012 => Some(flag_byte(sw.lcram)),
        0xC013 => Some(flag_byte(sw.ramrd)),
        0xC014 => Some(flag_byte(sw.ramwrt)),
        0xC015 => Some(flag_byte(sw.intcxrom)),
        0xC016 => Some(flag_byte(sw.altzp)),
        0xC017 => Some(flag_byte(sw.slotc3rom)),
        0xC018 => Some(flag_byte(sw._80store)),
        0xC019 => Some(flag_byte(sw.vbl)),
        0xC01A => Some(flag_byte(sw.text)),
        0xC01B => Some(flag_byte(sw.mixed)),
        0xC01C => Some(flag_byte(sw.page2)),
        0xC01D => Some(flag_byte(sw.hires)),
        0xC01E => Some(flag_byte(sw.altcharset)),
        0xC01F => Some(flag_byte(sw._80col)),
        0xC020..=0xC02F => None,
        0xC030..=0xC03F => {
            *ctx.speaker_toggled = !*ctx.speaker_toggled;
            None
        }
        0xC040..=0xC04F => None,
        0xC050 => set_display_switch(sw, |s| s.text = false),
        0xC051 => set_display_switch(sw, |s| s.text = true),
        0xC052 => set_display_switch(sw, |s| s.mixed = false),
        0xC053 => set_display_switch(sw, |s| s.mixed = true),
        0xC054 => set_display_switch(sw, |s| s.page2 = false),
        0xC055 => set_display_switch(sw, |s| s.page2 = true),
        0xC056 => set_display_switch(sw, |s| s.hires = false),
        0xC057 => set_display_switch(sw, |s| s.hires = true),
        0xC058..=0xC05F => {
            set_annunciator(sw, addr);
            None
        }
        0xC060 => None,
        0xC061 | 0xC069 => Some(apple_key_byte(sw.open_apple_pressed)),
        0xC062 | 0xC06A => Some(apple_key_byte(sw.solid_apple_pressed)),
        0xC063..=0xC068 | 0xC06B..=0xC06F => None,
        0xC070..=0xC07D => None,
        0xC07E => Some(ioudis_readback(sw.ioudis)),
        0xC07F => Some(ioudis_readback(sw.dhires)),
        0xC080..=0xC08F => {
            apply_lc_switch(sw, addr, true);
            Some(0xFF)
        }
        0xC090..=0xC0DF => None,
        0xC0E0..=0xC0EF => ctx.fdc.read(low_nibble(addr)),
        0xC0F0..=0xC0FF => ctx.hdc.read(low_nibble(addr), ctx.ram),
        _ => unreachable!("outside the $C000-$C0FF page"),
    }
}

pub fn dispatch_write(addr: u16, val: u8, ctx: &mut IoContext<'_>) {
    debug_assert!((0xC000..=0xC0FF).contains(&addr));
    let sw = &mut *ctx.switches;
    match addr {
        0xC000..=0xC00F => apply_memory_switch(sw, addr),
        0xC010 => ctx.keyboard.clear_strobe(),
        0xC011..=0xC01F => { /* read-only status switches */ }
        0xC020..=0xC02F => { /* cassette output, unimplemented periphery */ }
        0xC030..=0xC03F => *ctx.speaker_toggled = !*ctx.speaker_toggled,
        0xC040..=0xC04F => {}
        0xC050 => {
            sw.text = false;
        }
        0xC051 => {
            sw.text = true;
        }
        0xC052 => {
            sw.mixed = false;
        }
        0xC053 => {
            sw.mixed = true;
        }
        0xC054 => {
            sw.page2 = false;
        }
        0xC055 => {
            sw.page2 = true;
        }
        0xC056 => {
            sw.hires = false;
        }
        0xC057 => {
            sw.hires = true;
        }
        0xC058..=0xC05F => set_annunciator(sw, addr),
        0xC060..=0xC06F => {}
        0xC070..=0xC07D => {}
        0xC07E => sw.ioudis = true,
        0xC07F => sw.ioudis = false,
        0xC080..=0xC08F => apply_lc_switch(sw, addr, false),
        0xC090..=0xC0DF => {}
        0xC0E0..=0xC0EF => {
            ctx.fdc.write(low_nibble(addr), val);
        }
        0xC0F0..=0xC0FF => ctx.hdc.write(low_nibble(addr), val, ctx.ram),
        _ => unreachable!("outside the $C000-$C0FF page"),
    }
}

fn low_nibble(addr: u16) -> u8 {
    (addr & 0xF) as u8
}

/// $C011-$C01F read-back format: bit 7 carries the requested flag, remaining
/// bits undefined (zeroed here).
fn flag_byte(flag: bool) -> u8 {
    (flag as u8) << 7
}

fn apple_key_byte(pressed: bool) -> u8 {
    if pressed { 0x80 } else { 0x00 }
}

/// $C07E/$C07F read-back: bit 7 is the *inverse* of the flag (0 when set).
fn ioudis_readback(flag: bool) -> u8 {
    if flag { 0x00 } else { 0x80 }
}

/// $C000-$C00F write: the eight orthogonal memory-routing switches, an
/// even/odd address pair per switch (even = off, odd = on). `_80store`,
/// `ramrd`, `ramwrt`, and `altzp` feed the MMU's live bank routing, so a
/// real value change on one of them is traced (off by default; only useful
/// when chasing a bank-routing bug, see DESIGN.md/SPEC_FULL.md §10.1).
fn apply_memory_switch(sw: &mut SoftSwitches, addr: u16) {
    let on = addr & 1 != 0;
    match (addr & 0xF) >> 1 {
        0 => trace_bank_switch(&mut sw._80store, on, "80STORE"),
        1 => trace_bank_switch(&mut sw.ramrd, on, "RAMRD"),
        2 => trace_bank_switch(&mut sw.ramwrt, on, "RAMWRT"),
        3 => sw.intcxrom = on,
        4 => trace_bank_switch(&mut sw.altzp, on, "ALTZP"),
        5 => sw.slotc3rom = on,
        6 => sw._80col = on,
        7 => sw.altcharset = on,
        _ => unreachable!(),
    }
}

fn trace_bank_switch(flag: &mut bool, on: bool, name: &str) {
    if *flag != on {
        trace!("{name} -> {on}, bank routing re-derived");
    }
    *flag = on;
}

/// $C050-$C057 on CPU read: the switch also takes effect (reads and writes
/// are both valid strobes), but the data bus value is undefined (`None`).
fn set_display_switch(sw: &mut SoftSwitches, apply: impl FnOnce(&mut SoftSwitches)) -> Option<u8> {
    apply(sw);
    None
}

/// $C058-$C05F: four annunciator outputs, each controlled by an even
/// (clear)/odd (set) address pair. AN3 ($C05E/$C05F) additionally gates
/// double-hires, but only while IOUDIS is asserted (the source's polarity;
/// see DESIGN.md for the hardware-divergence note).
fn set_annunciator(sw: &mut SoftSwitches, addr: u16) {
    if !sw.ioudis {
        return;
    }
    if addr == 0xC05E {
        sw.dhires = true;
    } else if addr == 0xC05F {
        sw.dhires = false;
    }
}

/// $C080-$C08F: the language-card bank-select/pre-write-latch protocol.
/// Two consecutive reads of an odd address arm writes; any other access
/// pattern disarms them. Writes always clear the latch without arming it.
fn apply_lc_switch(sw: &mut SoftSwitches, addr: u16, is_read: bool) {
    let a = addr & 0xF;
    sw.lcbnk2 = a & 0x8 == 0;
    sw.lcram = matches!(a & 0x3, 0x0 | 0x3);
    let odd = a & 0x1 != 0;
    if !odd {
        sw.prewrite = false;
        sw.write_enabled = false;
    } else if is_read {
        if sw.prewrite {
            sw.write_enabled = true;
        } else {
            sw.prewrite = true;
        }
    } else {
        sw.prewrite = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdc::NullFloppyController;
    use crate::hdc::NullHardDiskController;

    struct Fixture {
        sw: SoftSwitches,
        kb: Keyboard,
        fdc: NullFloppyController,
        hdc: NullHardDiskController,
        ram: Vec<u8>,
        speaker: bool,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                sw: SoftSwitches::default(),
                kb: Keyboard::default(),
                fdc: NullFloppyController,
                hdc: NullHardDiskController,
                ram: vec![0; 0x10000],
                speaker: false,
            }
        }

        fn ctx(&mut self) -> IoContext<'_> {
            IoContext {
                switches: &mut self.sw,
                keyboard: &mut self.kb,
                fdc: &mut self.fdc,
                hdc: &mut self.hdc,
                ram: &mut self.ram,
                speaker_toggled: &mut self.speaker,
            }
        }
    }

    #[test]
    fn lc_prewrite_latch_requires_two_reads() {
        let mut f = Fixture::new();
        let mut c = f.ctx();
        dispatch_read(0xC083, &mut c);
        assert!(!f.sw.write_enabled);
        assert!(f.sw.prewrite);
        let mut c = f.ctx();
        dispatch_read(0xC083, &mut c);
        assert!(f.sw.write_enabled);
    }

    #[test]
    fn lc_write_between_reads_resets_latch_leaves_write_enabled() {
        let mut f = Fixture::new();
        let mut c = f.ctx();
        dispatch_read(0xC083, &mut c);
        let mut c = f.ctx();
        dispatch_write(0xC081, 0, &mut c);
        assert!(!f.sw.prewrite);
        assert!(!f.sw.write_enabled);
    }

    #[test]
    fn lc_bank_select_from_bit3() {
        let mut f = Fixture::new();
        let mut c = f.ctx();
        dispatch_read(0xC088, &mut c);
        assert!(!f.sw.lcbnk2);
        let mut c = f.ctx();
        dispatch_read(0xC080, &mut c);
        assert!(f.sw.lcbnk2);
    }

    #[test]
    fn c010_clears_latch_on_read() {
        let mut f = Fixture::new();
        f.kb.key_down(0x41);
        let mut c = f.ctx();
        let before = dispatch_read(0xC010, &mut c).unwrap();
        assert_eq!(before & 0x80, 0x80);
        assert_eq!(f.kb.latch() & 0x80, 0);
    }

    #[test]
    fn c000_read_is_keyboard_latch_regardless_of_offset() {
        let mut f = Fixture::new();
        f.kb.key_down(0x41);
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC000, &mut c), Some(0xC1));
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC005, &mut c), Some(0xC1));
    }

    #[test]
    fn c000_write_toggles_memory_switches() {
        let mut f = Fixture::new();
        let mut c = f.ctx();
        dispatch_write(0xC001, 0, &mut c);
        assert!(f.sw._80store);
        let mut c = f.ctx();
        dispatch_write(0xC000, 0, &mut c);
        assert!(!f.sw._80store);

        let mut c = f.ctx();
        dispatch_write(0xC009, 0, &mut c);
        assert!(f.sw.altzp);

        let mut c = f.ctx();
        dispatch_write(0xC00F, 0, &mut c);
        assert!(f.sw.altcharset);
    }

    #[test]
    fn status_switch_readback_carries_only_bit7() {
        let mut f = Fixture::new();
        f.sw.ioudis = true;
        f.sw.text = true;
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC01A, &mut c), Some(0x80));
        f.sw.text = false;
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC01A, &mut c), Some(0x00));
    }

    #[test]
    fn c080_always_reads_0xff() {
        let mut f = Fixture::new();
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC08F, &mut c), Some(0xFF));
    }

    #[test]
    fn unmapped_windows_float() {
        let mut f = Fixture::new();
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC031, &mut c), None);
        assert_eq!(dispatch_read(0xC0A3, &mut c), None);
        assert_eq!(dispatch_read(0xC0C1, &mut c), None);
        assert_eq!(dispatch_read(0xC095, &mut c), None);
    }

    #[test]
    fn dhires_gated_by_ioudis() {
        let mut f = Fixture::new();
        f.sw.ioudis = false;
        let mut c = f.ctx();
        dispatch_write(0xC05E, 0, &mut c);
        assert!(!f.sw.dhires);

        f.sw.ioudis = true;
        let mut c = f.ctx();
        dispatch_write(0xC05E, 0, &mut c);
        assert!(f.sw.dhires);
    }

    #[test]
    fn ioudis_switch_and_readback() {
        let mut f = Fixture::new();
        let mut c = f.ctx();
        dispatch_write(0xC07F, 0, &mut c);
        assert!(!f.sw.ioudis);
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC07E, &mut c), Some(0x80));
        let mut c = f.ctx();
        dispatch_write(0xC07E, 0, &mut c);
        assert!(f.sw.ioudis);
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC07E, &mut c), Some(0x00));
    }

    #[test]
    fn apple_key_modifiers_readback() {
        let mut f = Fixture::new();
        f.sw.open_apple_pressed = true;
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC061, &mut c), Some(0x80));
        assert_eq!(dispatch_read(0xC069, &mut c), Some(0x80));
        assert_eq!(dispatch_read(0xC062, &mut c), Some(0x00));
    }

    #[test]
    fn fdc_hdc_windows_route_to_devices() {
        let mut f = Fixture::new();
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC0E0, &mut c), Some(0x00));
        let mut c = f.ctx();
        assert_eq!(dispatch_read(0xC0F0, &mut c), Some(0x00));
    }
}
