//! Coded Picture Buffer FIFO, grounded on `h264_hrd_cpb.c`'s array-backed
//! `HRDCpbBr` ring buffer.
//!
//! Per SPEC_FULL.md Design Note §9, the source's manual FIFO shifting is
//! replaced with a power-of-two-capacity, mask-indexed circular buffer.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::hrd::dpb::AdaptiveMarkingOp;

/// One access unit sitting in the CPB awaiting removal, carrying the
/// picture's own metadata (SPEC_FULL.md §3) so that when it is popped, the
/// DPB marking machine is driven by *this* picture's fields rather than
/// whichever access unit happens to be current at removal time.
#[derive(Debug, Clone)]
pub struct CpbEntry {
    pub au_idx: u64,
    pub length_bits: u64,
    pub removal_time: u64,
    pub frame_num: u32,
    pub field_pic_flag: bool,
    pub bottom_field_flag: bool,
    pub idr_pic_flag: bool,
    pub sps_long_term_reference_flag: bool,
    pub adaptive_marking: Option<alloc::vec::Vec<AdaptiveMarkingOp>>,
    pub dpb_output_delay_ticks: u64,
}

/// Power-of-two-capacity ring buffer of [`CpbEntry`] values.
#[derive(Debug)]
pub struct CpbFifo {
    buf: Vec<Option<CpbEntry>>,
    mask: usize,
    head: usize,
    len: usize,
}

impl CpbFifo {
    /// `capacity` is rounded up to the next power of two.
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1).next_power_of_two();
        CpbFifo { buf: alloc::vec![None; cap], mask: cap - 1, head: 0, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_back(&mut self, entry: CpbEntry) -> Result<()> {
        if self.len == self.buf.len() {
            return Err(Error::DataShapeProblem { msg: "CPB FIFO capacity exceeded" });
        }
        let idx = (self.head + self.len) & self.mask;
        self.buf[idx] = Some(entry);
        self.len += 1;
        Ok(())
    }

    pub fn front(&self) -> Option<CpbEntry> {
        if self.len == 0 {
            None
        } else {
            self.buf[self.head].clone()
        }
    }

    /// Remove and return every remaining entry in removal-time (FIFO) order.
    /// Used to flush the CPB at end of stream, where no later access unit
    /// arrives to drive further removals.
    pub fn drain(&mut self) -> alloc::vec::Vec<CpbEntry> {
        let mut out = alloc::vec::Vec::with_capacity(self.len);
        while let Some(e) = self.pop_front() {
            out.push(e);
        }
        out
    }

    pub fn pop_front(&mut self) -> Option<CpbEntry> {
        if self.len == 0 {
            return None;
        }
        let entry = self.buf[self.head].take();
        self.head = (self.head + 1) & self.mask;
        self.len -= 1;
        entry
    }

    pub fn occupancy_bits(&self) -> u64 {
        let mut sum = 0u64;
        for i in 0..self.len {
            let idx = (self.head + i) & self.mask;
            if let Some(e) = &self.buf[idx] {
                sum += e.length_bits;
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(au_idx: u64, length_bits: u64, removal_time: u64) -> CpbEntry {
        CpbEntry {
            au_idx,
            length_bits,
            removal_time,
            frame_num: au_idx as u32,
            field_pic_flag: false,
            bottom_field_flag: false,
            idr_pic_flag: au_idx == 0,
            sps_long_term_reference_flag: false,
            adaptive_marking: None,
            dpb_output_delay_ticks: 0,
        }
    }

    #[test]
    fn fifo_rounds_capacity_to_power_of_two() {
        let fifo = CpbFifo::new(5);
        assert_eq!(fifo.buf.len(), 8);
    }

    #[test]
    fn push_pop_preserves_order() {
        let mut fifo = CpbFifo::new(4);
        fifo.push_back(entry(0, 100, 10)).unwrap();
        fifo.push_back(entry(1, 200, 20)).unwrap();
        assert_eq!(fifo.pop_front().unwrap().au_idx, 0);
        assert_eq!(fifo.pop_front().unwrap().au_idx, 1);
        assert!(fifo.pop_front().is_none());
    }

    #[test]
    fn occupancy_sums_all_entries() {
        let mut fifo = CpbFifo::new(4);
        fifo.push_back(entry(0, 100, 10)).unwrap();
        fifo.push_back(entry(1, 200, 20)).unwrap();
        assert_eq!(fifo.occupancy_bits(), 300);
    }

    #[test]
    fn full_fifo_rejects_push() {
        let mut fifo = CpbFifo::new(2);
        fifo.push_back(entry(0, 1, 1)).unwrap();
        fifo.push_back(entry(1, 1, 1)).unwrap();
        assert!(fifo.push_back(entry(2, 1, 1)).is_err());
    }

    #[test]
    fn drain_returns_remaining_entries_in_order() {
        let mut fifo = CpbFifo::new(4);
        fifo.push_back(entry(0, 1, 1)).unwrap();
        fifo.push_back(entry(1, 1, 2)).unwrap();
        let drained = fifo.drain();
        assert_eq!(drained.iter().map(|e| e.au_idx).collect::<alloc::vec::Vec<_>>(), [0, 1]);
        assert!(fifo.is_empty());
    }
}
