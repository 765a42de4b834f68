//! The top-level aggregate: wires the MMU, soft switches, keyboard, beeper,
//! video, and peripheral controllers together behind the CPU collaborator's
//! bus seam, and drives the per-tick timing orchestration.
//!
//! [`Machine`] is split into a `cpu: C` field and a `bus: MachineBus` field,
//! rather than `Machine` itself implementing [`CpuBus`], so that
//! `self.cpu.step(&mut self.bus)` borrows two disjoint fields instead of
//! re-entering `self` through a trait object. This generalizes the
//! `Video<T: Renderer>` split this crate's rendering pipeline was adapted
//! from: "the thing driving" and "the thing driven" live in separate
//! fields so the borrow checker can see they don't alias.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::beeper::Beeper;
use crate::cpu::{Cpu65C02, CpuBus};
use crate::debuggable::{Debuggable, DebuggableProperties, DebuggableProperty, DebuggablePropertyValue};
use crate::fdc::{FloppyController, NullFloppyController};
use crate::hdc::{HardDiskController, NullHardDiskController};
use crate::io::{self, IoContext};
use crate::keyboard::Keyboard;
use crate::mmu::Mmu;
use crate::softswitches::SoftSwitches;
use crate::tickable::{Ticks, Tickable};
use crate::video::Video;
use crate::{dbgprop_bool, dbgprop_byte_bin, dbgprop_group, dbgprop_header, dbgprop_udec, dbgprop_word};

/// The 65C02's master clock rate on an NTSC Apple //e.
pub const FREQUENCY: u64 = 1_021_800;
const VBL_START_TICK: u64 = 12_480;
const VBL_PERIOD_TICKS: u64 = 17_030;
const FDC_TICK_INTERVAL: u64 = 128;
const FLASH_HALF_PERIOD: u64 = FREQUENCY / 2;
const KEYBOARD_ROM_SIZE: usize = 0x800;
const MAX_AUDIO_SAMPLES: usize = 2048;
const DEFAULT_SAMPLE_RATE: u64 = 22_050;
const DEFAULT_VOLUME: f32 = 1.0;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("{0} must be {1} bytes, got {2}")]
    RomSize(&'static str, usize, usize),
    #[error("audio.num_samples must be <= {0}, got {1}")]
    AudioSampleCount(usize, usize),
}

/// The ROM images [`Machine::new`] validates and takes ownership of.
/// `keyboard_rom` is validated for size but otherwise unused: the keyboard
/// encoder matrix it describes is folded into [`Machine::key_down`]'s ASCII
/// mapping instead of being interpreted at runtime.
#[derive(Clone)]
pub struct RomSet {
    pub rom: Vec<u8>,
    pub character_rom: Vec<u8>,
    pub keyboard_rom: Vec<u8>,
    pub fdc_rom: Vec<u8>,
    pub hdc_rom: Vec<u8>,
}

pub type AudioCallback = Box<dyn FnMut(&[u8]) + Send>;

/// Audio sink configuration: samples are accumulated at `sample_rate`,
/// volume-scaled, and handed to `callback` in chunks of `num_samples`.
pub struct AudioConfig {
    pub sample_rate: u64,
    pub num_samples: usize,
    pub volume: f32,
    pub callback: Option<AudioCallback>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            num_samples: MAX_AUDIO_SAMPLES,
            volume: DEFAULT_VOLUME,
            callback: None,
        }
    }
}

/// Host-side debugging hooks: `on_tick` is invoked once per executed
/// instruction inside [`Machine::exec`]; returning `true` halts execution
/// early, mirroring a debugger's single-step/breakpoint stop condition.
#[derive(Default)]
pub struct DebugHooks {
    pub on_tick: Option<Box<dyn FnMut() -> bool>>,
}

/// Constructor input for [`Machine::new`]. ROMs are mandatory; everything
/// else defaults to a plain, disk-less, silent, non-debugged machine.
pub struct MachineDescriptor {
    pub roms: RomSet,
    pub audio: AudioConfig,
    pub debug: Option<DebugHooks>,
    pub fdc_enabled: bool,
    pub hdc_enabled: bool,
    pub fdc: Option<Box<dyn FloppyController>>,
    pub hdc: Option<Box<dyn HardDiskController>>,
    /// Number of floppy images the host has resolved and can swap in via
    /// F1-F9; the core holds only this count, never the image bytes
    /// themselves (see DESIGN.md).
    pub floppy_image_count: usize,
}

/// Capacity-bounded, volume-scaled accumulator between [`Beeper`]'s raw
/// level samples and the host audio callback, mirroring the buffer-until-
/// full/flush-then-clear shape this crate's audio pipeline was adapted from.
struct AudioBuffer {
    buf: Vec<u8>,
    capacity: usize,
    volume: f32,
}

impl AudioBuffer {
    fn new(capacity: usize, volume: f32) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            volume,
        }
    }

    fn push_all(&mut self, samples: &[u8], callback: &mut Option<AudioCallback>) {
        for &level in samples {
            let scaled = ((level as f32) * self.volume).clamp(0.0, 255.0) as u8;
            self.buf.push(scaled);
            if self.buf.len() >= self.capacity {
                if let Some(cb) = callback {
                    cb(&self.buf);
                }
                self.buf.clear();
            }
        }
    }
}

/// Everything the CPU collaborator's bus seam touches: memory, soft
/// switches, keyboard, beeper, video, and the peripheral controllers, plus
/// the timing counters the per-cycle orchestrator advances. Kept separate
/// from [`Machine`] so the CPU field can borrow it mutably on its own.
struct MachineBus {
    mmu: Mmu,
    switches: SoftSwitches,
    keyboard: Keyboard,
    beeper: Beeper,
    video: Video,
    fdc: Box<dyn FloppyController>,
    hdc: Box<dyn HardDiskController>,
    system_ticks: u64,
    vbl_ticks: u64,
    flash_timer_ticks: u64,
    audio: AudioBuffer,
    audio_callback: Option<AudioCallback>,
    floppy_image_count: usize,
}

impl MachineBus {
    /// Steps 1-2 of the per-cycle orchestration (spec.md §4.3): the
    /// VBL-window check/advance that must be visible to *this* cycle's bus
    /// transaction, run before it.
    fn begin_cycle(&mut self) {
        if self.vbl_ticks == VBL_START_TICK {
            self.switches.vbl = true;
        }
        self.vbl_ticks += 1;
        if self.vbl_ticks >= VBL_PERIOD_TICKS {
            self.vbl_ticks = 0;
            self.switches.vbl = false;
        }
    }

    /// Steps 5-8: audio sampling, the FDC's periodic tick, and the
    /// flash-attribute timer, run after this cycle's bus transaction has
    /// landed.
    fn end_cycle(&mut self) {
        // A master-clock advance of exactly 1 tick can never overflow or
        // otherwise fail; `Tickable::tick`'s `Result` exists for the trait's
        // general contract, not because this call can actually err.
        let _ = self.beeper.tick(1);
        let pending = self.beeper.take_pending();
        if !pending.is_empty() {
            self.audio.push_all(&pending, &mut self.audio_callback);
        }

        if self.system_ticks % FDC_TICK_INTERVAL == 0 {
            self.fdc.tick();
        }

        if self.flash_timer_ticks == 0 {
            self.flash_timer_ticks = FLASH_HALF_PERIOD;
        } else {
            self.flash_timer_ticks -= 1;
        }
        if self.flash_timer_ticks == 0 {
            self.switches.flash = !self.switches.flash;
            self.video.mark_flash_dirty(self.switches.page2);
        }

        self.system_ticks += 1;
    }

    /// Runs one full master-clock cycle's worth of orchestration
    /// (`begin_cycle` + `end_cycle`) with no bus transaction sandwiched in
    /// between, for tests that exercise only the VBL/flash/beeper/FDC
    /// timing in isolation. `cpu_read`/`cpu_write` below are the real
    /// per-cycle entry points in production: each performs its own bus
    /// transaction between the same two calls.
    #[cfg(test)]
    fn advance_timing(&mut self) {
        self.begin_cycle();
        self.end_cycle();
    }
}

impl CpuBus for MachineBus {
    /// One master-clock cycle's single bus transaction (spec.md §4.3,
    /// steps 1-8): the CPU collaborator calls this once per cycle of an
    /// instruction, never once per whole instruction, so a decoder
    /// performing its own internal/dummy-read cycles still sees
    /// VBL/flash/beeper state exactly as of its own cycle rather than a
    /// batch applied after the instruction retires.
    fn cpu_read(&mut self, addr: u16) -> u8 {
        self.begin_cycle();
        let val = if (0xC000..=0xC0FF).contains(&addr) {
            let mut speaker_toggled = false;
            let val = {
                let mut ctx = IoContext {
                    switches: &mut self.switches,
                    keyboard: &mut self.keyboard,
                    fdc: self.fdc.as_mut(),
                    hdc: self.hdc.as_mut(),
                    ram: &mut self.mmu.ram,
                    speaker_toggled: &mut speaker_toggled,
                };
                io::dispatch_read(addr, &mut ctx)
            };
            if speaker_toggled {
                self.beeper.toggle();
            }
            val.unwrap_or(0x00)
        } else {
            self.mmu.read(addr, &self.switches).unwrap_or(0x00)
        };
        self.end_cycle();
        val
    }

    fn cpu_write(&mut self, addr: u16, val: u8) {
        self.begin_cycle();
        if (0xC000..=0xC0FF).contains(&addr) {
            let mut speaker_toggled = false;
            {
                let mut ctx = IoContext {
                    switches: &mut self.switches,
                    keyboard: &mut self.keyboard,
                    fdc: self.fdc.as_mut(),
                    hdc: self.hdc.as_mut(),
                    ram: &mut self.mmu.ram,
                    speaker_toggled: &mut speaker_toggled,
                };
                io::dispatch_write(addr, val, &mut ctx);
            }
            if speaker_toggled {
                self.beeper.toggle();
            }
        } else {
            self.mmu.write(addr, val, &self.switches);
            self.video.mark_write(addr);
        }
        self.end_cycle();
    }
}

/// The Apple //e core aggregate, generic over the CPU decoder a host plugs
/// in. Owns everything between the CPU's bus seam and the framebuffer: no
/// instruction decoding, floppy-nibble encoding, or host I/O glue lives
/// here (those are the opaque collaborators' concern).
pub struct Machine<C: Cpu65C02> {
    cpu: C,
    bus: MachineBus,
    debug: Option<DebugHooks>,
}

impl<C: Cpu65C02> Machine<C> {
    pub fn new(desc: MachineDescriptor, mut cpu: C) -> Result<Self, InitError> {
        if desc.roms.keyboard_rom.len() != KEYBOARD_ROM_SIZE {
            return Err(InitError::RomSize(
                "keyboard_rom",
                KEYBOARD_ROM_SIZE,
                desc.roms.keyboard_rom.len(),
            ));
        }
        if desc.audio.num_samples > MAX_AUDIO_SAMPLES {
            return Err(InitError::AudioSampleCount(MAX_AUDIO_SAMPLES, desc.audio.num_samples));
        }

        let mmu = Mmu::new(
            desc.roms.rom,
            desc.roms.character_rom,
            desc.roms.fdc_rom,
            desc.roms.hdc_rom,
            desc.fdc_enabled,
            desc.hdc_enabled,
        )?;

        let mut bus = MachineBus {
            mmu,
            switches: SoftSwitches::default(),
            keyboard: Keyboard::default(),
            beeper: Beeper::new(FREQUENCY, desc.audio.sample_rate),
            video: Video::new(),
            fdc: desc.fdc.unwrap_or_else(|| Box::new(NullFloppyController)),
            hdc: desc.hdc.unwrap_or_else(|| Box::new(NullHardDiskController)),
            system_ticks: 0,
            vbl_ticks: 0,
            flash_timer_ticks: FLASH_HALF_PERIOD,
            audio: AudioBuffer::new(desc.audio.num_samples, desc.audio.volume),
            audio_callback: desc.audio.callback,
            floppy_image_count: desc.floppy_image_count,
        };

        cpu.reset(&mut bus);
        debug!("apple //e core initialized, fdc_enabled={} hdc_enabled={}", desc.fdc_enabled, desc.hdc_enabled);

        Ok(Self {
            cpu,
            bus,
            debug: desc.debug,
        })
    }

    /// Resets RAM, soft switches, the beeper, and the attached peripherals
    /// to their power-on state, then resets the CPU. The framebuffer and
    /// its dirty flags are untouched, matching a real reset: only
    /// construction clears them.
    pub fn reset(&mut self) {
        self.bus.mmu.reset();
        self.bus.switches.reset();
        self.bus.keyboard.reset();
        self.bus.beeper.reset();
        self.bus.fdc.reset();
        self.bus.hdc.reset();
        self.cpu.reset(&mut self.bus);
        debug!("reset");
    }

    /// Steps the CPU by one instruction. The timing orchestrator is not a
    /// separate post-pass here: every individual bus transaction the CPU
    /// collaborator performs while decoding the instruction (one per
    /// master-clock cycle, see `MachineBus::cpu_read`/`cpu_write`) already
    /// carries its own VBL/flash/beeper/FDC bookkeeping, so by the time
    /// `step` returns, the full instruction's worth of timing has been
    /// applied one cycle at a time. Returns the number of master-clock
    /// ticks consumed.
    pub fn tick(&mut self) -> anyhow::Result<Ticks> {
        let step = self.cpu.step(&mut self.bus)?;
        if step.reset_requested {
            self.reset();
        }
        Ok(step.cycles)
    }

    /// Runs instructions until at least `micro_seconds` of emulated time
    /// has elapsed, then updates the framebuffer once. Returns the number
    /// of master-clock ticks actually consumed, which may slightly exceed
    /// the requested budget since instructions aren't interruptible
    /// mid-execution.
    pub fn exec(&mut self, micro_seconds: u32) -> anyhow::Result<Ticks> {
        let target_ticks = (FREQUENCY * micro_seconds as u64) / 1_000_000;
        let mut elapsed: Ticks = 0;
        while elapsed < target_ticks {
            elapsed += self.tick()?;
            if let Some(hooks) = &mut self.debug {
                if let Some(cb) = &mut hooks.on_tick {
                    if cb() {
                        break;
                    }
                }
            }
        }
        self.screen_update();
        Ok(elapsed)
    }

    /// Handles a host key-press event: arrow-key remapping, F1-F9 disk
    /// swap, F12 reset, the GUI/Apple modifier keys, and otherwise latches
    /// the ASCII code for the CPU to read at $C000.
    pub fn key_down(&mut self, key_code: u16) {
        let key_code = match key_code {
            0x14F => 0x15,
            0x150 => 0x08,
            0x151 => 0x0A,
            0x152 => 0x0B,
            other => other,
        };

        match key_code {
            0x13A..=0x142 => {
                let index = (key_code - 0x13A) as usize;
                if self.bus.mmu.fdc_present && index < self.bus.floppy_image_count {
                    self.bus.fdc.swap_disk(index);
                }
            }
            0x145 => self.reset(),
            0x1E3 => self.bus.switches.open_apple_pressed = true,
            0x1E7 => self.bus.switches.solid_apple_pressed = true,
            _ => {
                if key_code < 128 {
                    self.bus.keyboard.key_down(key_code as u8);
                }
            }
        }
    }

    /// Handles a host key-release event: only the GUI/Apple modifier keys
    /// have any effect; the keyboard latch only ever reports key-downs.
    pub fn key_up(&mut self, key_code: u16) {
        match key_code {
            0x1E3 => self.bus.switches.open_apple_pressed = false,
            0x1E7 => self.bus.switches.solid_apple_pressed = false,
            _ => {}
        }
    }

    /// Renders the current display mode into the framebuffer, skipping any
    /// page that isn't marked dirty.
    pub fn screen_update(&mut self) {
        self.bus.video.screen_update(
            &self.bus.switches,
            &self.bus.mmu.character_rom,
            &self.bus.mmu.ram,
            &self.bus.mmu.aux_ram,
        );
    }

    /// The rendered framebuffer: one byte per two horizontal pixels, 192
    /// rows of 280 bytes each.
    pub fn fb(&self) -> &[u8] {
        self.bus.video.fb()
    }
}

impl<C: Cpu65C02> Debuggable for Machine<C> {
    fn get_debug_properties(&self) -> DebuggableProperties {
        let sw = &self.bus.switches;
        vec![
            dbgprop_header!("Apple //e"),
            dbgprop_udec!("System ticks", self.bus.system_ticks),
            dbgprop_udec!("VBL ticks", self.bus.vbl_ticks),
            dbgprop_word!("CPU PC", self.cpu.pc()),
            dbgprop_group!(
                "Soft switches",
                vec![
                    dbgprop_bool!("TEXT", sw.text),
                    dbgprop_bool!("MIXED", sw.mixed),
                    dbgprop_bool!("PAGE2", sw.page2),
                    dbgprop_bool!("HIRES", sw.hires),
                    dbgprop_bool!("DHIRES", sw.dhires),
                    dbgprop_bool!("80COL", sw._80col),
                    dbgprop_bool!("ALTCHARSET", sw.altcharset),
                    dbgprop_bool!("80STORE", sw._80store),
                    dbgprop_bool!("RAMRD", sw.ramrd),
                    dbgprop_bool!("RAMWRT", sw.ramwrt),
                    dbgprop_bool!("ALTZP", sw.altzp),
                    dbgprop_bool!("INTCXROM", sw.intcxrom),
                    dbgprop_bool!("SLOTC3ROM", sw.slotc3rom),
                    dbgprop_bool!("LCRAM", sw.lcram),
                    dbgprop_bool!("LCBNK2", sw.lcbnk2),
                    dbgprop_bool!("IOUDIS", sw.ioudis),
                    dbgprop_bool!("VBL", sw.vbl),
                    dbgprop_bool!("FLASH", sw.flash),
                ]
            ),
            dbgprop_byte_bin!("Keyboard latch", self.bus.keyboard.latch()),
            dbgprop_bool!("Open-Apple", sw.open_apple_pressed),
            dbgprop_bool!("Solid-Apple", sw.solid_apple_pressed),
        ]
    }
}

/// The position-independent, versioned-by-the-container serialization of a
/// machine's volatile state: both RAM planes, soft switches, the keyboard
/// latch, the video state (including its dirty flags and framebuffer), and
/// the timing counters. ROMs, the CPU, the FDC/HDC peripherals, and host
/// callbacks are excluded and re-attached from the live instance on load,
/// the same way the audio/debug callbacks and ROM pointers are excluded and
/// re-supplied in the source this was adapted from (see DESIGN.md: FDC/HDC
/// trait objects have no serialization contract here, so a host that needs
/// to snapshot them does so separately through its own concrete type).
#[derive(Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub(crate) ram: Vec<u8>,
    pub(crate) aux_ram: Vec<u8>,
    pub(crate) switches: SoftSwitches,
    pub(crate) keyboard: Keyboard,
    pub(crate) video: Video,
    pub(crate) system_ticks: u64,
    pub(crate) vbl_ticks: u64,
    pub(crate) flash_timer_ticks: u64,
}

impl<C: Cpu65C02> Machine<C> {
    pub fn save_snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            ram: self.bus.mmu.ram.clone(),
            aux_ram: self.bus.mmu.aux_ram.clone(),
            switches: self.bus.switches.clone(),
            keyboard: self.bus.keyboard.clone(),
            video: self.bus.video.clone(),
            system_ticks: self.bus.system_ticks,
            vbl_ticks: self.bus.vbl_ticks,
            flash_timer_ticks: self.bus.flash_timer_ticks,
        }
    }

    /// Restores RAM, soft switches, the keyboard latch, video state, and
    /// timing counters from `snapshot`. Returns `false` (leaving `self`
    /// untouched) if the snapshot's RAM planes are the wrong size, the only
    /// sanity check available once the version/format envelope (see
    /// `save.rs`) has already been accepted.
    pub fn load_snapshot(&mut self, snapshot: MachineSnapshot) -> bool {
        if snapshot.ram.len() != crate::mmu::RAM_SIZE || snapshot.aux_ram.len() != crate::mmu::RAM_SIZE {
            return false;
        }
        self.bus.mmu.ram = snapshot.ram;
        self.bus.mmu.aux_ram = snapshot.aux_ram;
        self.bus.switches = snapshot.switches;
        self.bus.keyboard = snapshot.keyboard;
        self.bus.video = snapshot.video;
        self.bus.system_ticks = snapshot.system_ticks;
        self.bus.vbl_ticks = snapshot.vbl_ticks;
        self.bus.flash_timer_ticks = snapshot.flash_timer_ticks;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::TestCpu;
    use crate::mmu::{CHARACTER_ROM_SIZE, PERIPHERAL_ROM_SIZE, ROM_SIZE};

    fn roms() -> RomSet {
        RomSet {
            rom: vec![0xEA; ROM_SIZE],
            character_rom: vec![0; CHARACTER_ROM_SIZE],
            keyboard_rom: vec![0; KEYBOARD_ROM_SIZE],
            fdc_rom: vec![0; PERIPHERAL_ROM_SIZE],
            hdc_rom: vec![0; PERIPHERAL_ROM_SIZE],
        }
    }

    fn descriptor() -> MachineDescriptor {
        MachineDescriptor {
            roms: roms(),
            audio: AudioConfig::default(),
            debug: None,
            fdc_enabled: true,
            hdc_enabled: false,
            fdc: None,
            hdc: None,
            floppy_image_count: 1,
        }
    }

    fn machine() -> Machine<TestCpu> {
        Machine::new(descriptor(), TestCpu::default()).unwrap()
    }

    #[test]
    fn rejects_wrong_sized_roms() {
        let mut desc = descriptor();
        desc.roms.rom.pop();
        assert!(matches!(
            Machine::new(desc, TestCpu::default()),
            Err(InitError::RomSize("rom", ROM_SIZE, n)) if n == ROM_SIZE - 1
        ));
    }

    #[test]
    fn rejects_keyboard_rom_wrong_size() {
        let mut desc = descriptor();
        desc.roms.keyboard_rom.pop();
        assert!(matches!(Machine::new(desc, TestCpu::default()), Err(InitError::RomSize("keyboard_rom", ..))));
    }

    #[test]
    fn rejects_oversized_audio_buffer() {
        let mut desc = descriptor();
        desc.audio.num_samples = MAX_AUDIO_SAMPLES + 1;
        assert!(matches!(Machine::new(desc, TestCpu::default()), Err(InitError::AudioSampleCount(..))));
    }

    #[test]
    fn vbl_asserts_and_clears_at_window_edges() {
        let mut m = machine();
        // The assertion check compares vbl_ticks to VBL_START_TICK before
        // incrementing, so it takes VBL_START_TICK+1 calls to observe it.
        for _ in 0..=VBL_START_TICK {
            m.bus.advance_timing();
        }
        assert!(m.bus.switches.vbl);

        for _ in (VBL_START_TICK + 1)..VBL_PERIOD_TICKS {
            m.bus.advance_timing();
        }
        assert!(!m.bus.switches.vbl);
        assert_eq!(m.bus.vbl_ticks, 0);
    }

    #[test]
    fn flash_toggles_once_per_half_period() {
        let mut m = machine();
        assert!(!m.bus.switches.flash);
        for _ in 0..FLASH_HALF_PERIOD {
            m.bus.advance_timing();
        }
        assert!(m.bus.switches.flash);
    }

    #[test]
    fn keyboard_latch_round_trips_through_bus_routing() {
        let mut m = machine();
        m.key_down(b'A' as u16);
        assert_eq!(m.bus.cpu_read(0xC000), 0xC1);
        m.bus.cpu_write(0xC010, 0);
        assert_eq!(m.bus.cpu_read(0xC000) & 0x80, 0);
    }

    #[test]
    fn f12_triggers_reset() {
        let mut m = machine();
        m.bus.switches.text = true;
        m.key_down(0x145);
        assert!(!m.bus.switches.text);
    }

    #[test]
    fn gui_keys_set_and_clear_apple_modifiers() {
        let mut m = machine();
        m.key_down(0x1E3);
        assert!(m.bus.switches.open_apple_pressed);
        m.key_up(0x1E3);
        assert!(!m.bus.switches.open_apple_pressed);

        m.key_down(0x1E7);
        assert!(m.bus.switches.solid_apple_pressed);
        m.key_up(0x1E7);
        assert!(!m.bus.switches.solid_apple_pressed);
    }

    #[test]
    fn function_key_disk_swap_respects_image_count_bound() {
        let mut m = machine();
        // floppy_image_count is 1: index 0 in range, index 1 out of range.
        // Neither should panic; NullFloppyController::swap_disk is a no-op.
        m.key_down(0x13A);
        m.key_down(0x13B);
    }

    #[test]
    fn exec_consumes_at_least_the_requested_ticks() {
        let mut m = machine();
        let elapsed = m.exec(1_000).unwrap();
        let target = (FREQUENCY * 1_000) / 1_000_000;
        assert!(elapsed >= target);
    }

    #[test]
    fn snapshot_round_trips_ram_and_switches() {
        let mut m = machine();
        m.bus.mmu.ram[0x1234] = 0x42;
        m.bus.switches.text = true;
        m.key_down(b'Q' as u16);
        let snap = m.save_snapshot();

        let mut m2 = machine();
        assert!(m2.load_snapshot(snap));
        assert_eq!(m2.bus.mmu.ram[0x1234], 0x42);
        assert!(m2.bus.switches.text);
        assert_eq!(m2.bus.keyboard.latch(), m.bus.keyboard.latch());
    }

    #[test]
    fn snapshot_rejects_wrong_sized_ram() {
        let m = machine();
        let mut snap = m.save_snapshot();
        snap.ram.pop();
        let mut m2 = machine();
        assert!(!m2.load_snapshot(snap));
    }

    #[test]
    fn arrow_keys_remap_before_dispatch() {
        let mut m = machine();
        m.key_down(0x14F);
        assert_eq!(m.bus.keyboard.latch() & 0x7F, 0x15);
    }
}
