pub mod beeper;
pub mod bus;
pub mod cpu;
pub mod debuggable;
pub mod fdc;
pub mod hdc;
pub mod io;
pub mod keyboard;
pub mod machine;
pub mod mmu;
#[cfg(feature = "savestates")]
pub mod save;
pub mod softswitches;
pub mod tickable;
pub mod types;
pub mod video;

pub use machine::{AudioCallback, AudioConfig, DebugHooks, InitError, Machine, MachineDescriptor, MachineSnapshot, RomSet};

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub fn build_version() -> String {
    if built_info::GIT_COMMIT_HASH_SHORT.is_some() {
        format!(
            "{}-{}{}",
            built_info::PKG_VERSION,
            built_info::GIT_COMMIT_HASH_SHORT.unwrap(),
            if built_info::GIT_DIRTY.unwrap_or(false) {
                "-dirty"
            } else {
                ""
            }
        )
    } else {
        built_info::PKG_VERSION.to_string()
    }
}
