//! The Disk II floppy controller as an opaque collaborator: this crate owns
//! only the 16-byte $C0E0-$C0EF register window the dispatcher routes to it
//! (see `BusMember`). The controller's internal state (track position,
//! nibble encoding, write protection) is out of scope here and lives behind
//! this trait, per the core's OUT OF SCOPE boundary.

use crate::bus::BusMember;

pub trait FloppyController: BusMember<u8> {
    /// Advances the controller's own state machine. Called by the tick
    /// orchestrator every 128 system ticks, not every tick.
    fn tick(&mut self);
    fn reset(&mut self);
    /// Swaps in a different floppy image, indexed into the host-supplied
    /// disk-image list (F1-F9 key handling).
    fn swap_disk(&mut self, _index: usize) {}
}

/// A controller with no drives attached: register reads float to `0x00`,
/// writes are accepted and discarded.
pub struct NullFloppyController;

impl BusMember<u8> for NullFloppyController {
    fn read(&mut self, _offset: u8) -> Option<u8> {
        Some(0x00)
    }

    fn write(&mut self, _offset: u8, _val: u8) -> Option<()> {
        Some(())
    }
}

impl FloppyController for NullFloppyController {
    fn tick(&mut self) {}
    fn reset(&mut self) {}
}
