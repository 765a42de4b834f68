//! The save-state container: a small `binrw` header (magic, version,
//! compression method, model/build identifiers) wrapping a `postcard`-
//! encoded, `zstd`-compressed [`MachineSnapshot`]. The header is read and
//! version-checked before anything is decompressed or deserialized, so a
//! foreign or newer-format file is rejected up front rather than failing
//! midway through a partially-applied load.

use anyhow::{bail, Result};
use binrw::{binrw, BinRead, BinWrite, NullString};
use log::warn;

use crate::machine::MachineSnapshot;

const CURRENT_VERSION: u16 = 1;

#[binrw]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SaveCompression {
    #[brw(magic = 1u8)]
    None,
    #[brw(magic = 2u8)]
    Zstd,
}

#[binrw]
#[brw(little, magic = b"ORE2E")]
struct SaveHeader {
    /// Header/file version.
    pub version: u16,
    /// Type of compression used.
    pub compression: SaveCompression,
    /// Level of compression.
    pub compression_level: u8,
    /// Model identifier, currently always "apple2e".
    pub model: NullString,
    /// Core build version (short hash).
    pub core_version: NullString,
}

/// Writes a save state to the given writer.
pub fn save_state_to<W: std::io::Write + std::io::Seek>(mut writer: W, snapshot: &MachineSnapshot) -> Result<()> {
    let compression_level = 0; // library default

    let header = SaveHeader {
        version: CURRENT_VERSION,
        compression: SaveCompression::Zstd,
        compression_level,
        model: "apple2e".to_string().into(),
        core_version: crate::build_version().into(),
    };
    header.write(&mut writer)?;

    let compressor = zstd::stream::Encoder::new(writer, compression_level.into())?.auto_finish();
    postcard::to_io(snapshot, compressor)?;

    Ok(())
}

/// Loads a save state into a [`MachineSnapshot`] from a given reader.
///
/// Rejects the file (leaving nothing applied) on a version mismatch or an
/// unsupported compression method, matching the "reject outright and leave
/// the running instance untouched" contract this container format's save
/// state convention observes.
pub fn load_state_from<R: std::io::Read + std::io::Seek>(mut reader: R) -> Result<MachineSnapshot> {
    let header = SaveHeader::read(&mut reader)?;

    if header.version != CURRENT_VERSION {
        warn!("rejecting save state: version {} (expected {})", header.version, CURRENT_VERSION);
        bail!("Unsupported save state version {} (expected {})", header.version, CURRENT_VERSION);
    }

    if header.compression != SaveCompression::Zstd {
        bail!("Unsupported compression method {:?}", header.compression);
    }

    let decompressor = zstd::stream::Decoder::new(reader)?;

    // TODO remove static buffer once postcard supports reading without one,
    // tracking issue: https://github.com/jamesmunns/postcard/issues/162
    let mut buf = [0; 1024];
    let snapshot: MachineSnapshot = postcard::from_io((decompressor, &mut buf))?.0;

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::keyboard::Keyboard;
    use crate::softswitches::SoftSwitches;
    use crate::video::Video;

    fn sample_snapshot() -> MachineSnapshot {
        let mut kb = Keyboard::default();
        kb.key_down(b'Z');
        MachineSnapshot {
            ram: vec![0x5A; crate::mmu::RAM_SIZE],
            aux_ram: vec![0xA5; crate::mmu::RAM_SIZE],
            switches: SoftSwitches::default(),
            keyboard: kb,
            video: Video::new(),
            system_ticks: 12345,
            vbl_ticks: 678,
            flash_timer_ticks: 9,
        }
    }

    #[test]
    fn round_trips_through_the_compressed_container() {
        let snapshot = sample_snapshot();
        let mut buf = Cursor::new(Vec::new());
        save_state_to(&mut buf, &snapshot).unwrap();

        buf.set_position(0);
        let loaded = load_state_from(buf).unwrap();

        assert_eq!(loaded.ram, snapshot.ram);
        assert_eq!(loaded.aux_ram, snapshot.aux_ram);
        assert_eq!(loaded.system_ticks, snapshot.system_ticks);
        assert_eq!(loaded.keyboard.latch(), snapshot.keyboard.latch());
    }

    #[test]
    fn rejects_truncated_header() {
        let buf = Cursor::new(vec![0u8; 2]);
        assert!(load_state_from(buf).is_err());
    }
}
