//! The ProDOS-compatible hard disk controller as an opaque collaborator.
//! Unlike the FDC, its register window can trigger DMA-like block transfers
//! directly into/out of main RAM, so its register interface takes a mutable
//! slice of the machine's main RAM plane rather than round-tripping a block
//! byte at a time through the caller.

pub trait HardDiskController {
    /// $C0F0-$C0FF register read; may service part of a DMA block transfer
    /// out of `ram`.
    fn read(&mut self, offset: u8, ram: &mut [u8]) -> Option<u8>;
    /// $C0F0-$C0FF register write; may trigger a DMA block transfer into
    /// `ram` from the attached image.
    fn write(&mut self, offset: u8, val: u8, ram: &mut [u8]);
    fn tick(&mut self);
    fn reset(&mut self);
}

/// A controller with no disk image mounted: reads float to `0x00`, writes
/// are accepted and discarded.
pub struct NullHardDiskController;

impl HardDiskController for NullHardDiskController {
    fn read(&mut self, _offset: u8, _ram: &mut [u8]) -> Option<u8> {
        Some(0x00)
    }

    fn write(&mut self, _offset: u8, _val: u8, _ram: &mut [u8]) {}

    fn tick(&mut self) {}
    fn reset(&mut self) {}
}
