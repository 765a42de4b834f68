//! The one-bit speaker: every access to $C030-$C03F toggles the output
//! level. [`Beeper`] turns the master clock into a stream of `u8` samples at
//! the host-requested rate; the ring-buffering and sink-callback delivery
//! live one level up in [`crate::machine::Machine`], mirroring the
//! buffer-until-capacity/flush-then-clear shape a `push`-style audio
//! accumulator uses elsewhere in this codebase.

use crate::tickable::{Ticks, Tickable};

pub struct Beeper {
    level: u8,
    /// Master clock ticks accumulated since the last sample was emitted.
    tick_accum: u64,
    ticks_per_sample: u64,
    /// Samples produced since the last drain, awaiting the machine's ring
    /// buffer.
    pending: Vec<u8>,
}

impl Beeper {
    pub fn new(master_clock_hz: u64, sample_rate: u64) -> Self {
        Self {
            level: 0,
            tick_accum: 0,
            ticks_per_sample: (master_clock_hz / sample_rate).max(1),
            pending: Vec::new(),
        }
    }

    pub fn toggle(&mut self) {
        self.level = if self.level == 0 { 0xFF } else { 0x00 };
    }

    pub fn reset(&mut self) {
        self.level = 0;
        self.tick_accum = 0;
        self.pending.clear();
    }

    /// Drains and returns the samples produced since the last call.
    pub fn take_pending(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending)
    }
}

impl Tickable for Beeper {
    fn tick(&mut self, ticks: Ticks) -> anyhow::Result<Ticks> {
        self.tick_accum += ticks;
        while self.tick_accum >= self.ticks_per_sample {
            self.tick_accum -= self.ticks_per_sample;
            self.pending.push(self.level);
        }
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_level() {
        let mut b = Beeper::new(1_020_484, 22_050);
        b.toggle();
        assert_eq!(b.level, 0xFF);
        b.toggle();
        assert_eq!(b.level, 0x00);
    }

    #[test]
    fn produces_samples_at_rate() {
        let mut b = Beeper::new(220_500, 22_050);
        b.tick(220_500).unwrap();
        assert_eq!(b.take_pending().len(), 10);
    }

    #[test]
    fn pending_drains_on_take() {
        let mut b = Beeper::new(220_500, 22_050);
        b.tick(22_050).unwrap();
        assert_eq!(b.take_pending().len(), 1);
        assert!(b.take_pending().is_empty());
    }
}
