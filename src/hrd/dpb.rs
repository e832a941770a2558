//! Decoded Picture Buffer FIFO and the §8.2.5 marking machine, grounded on
//! `h264_hrd_dpb.c`/`h264_hrd_dpb_picture.c`.

use alloc::vec::Vec;

use crate::diagnostics::{DiagnosticEvent, DiagnosticLevel, DiagnosticSink};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureUsage {
    NotUsed,
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone, Copy)]
pub struct DpbEntry {
    pub au_idx: u64,
    pub frame_display_num: u64,
    pub frame_num: u32,
    pub field_pic_flag: bool,
    pub bottom_field_flag: bool,
    pub long_term_frame_idx: Option<u32>,
    pub output_time: u64,
    pub usage: PictureUsage,
}

/// Power-of-two-capacity ring buffer of [`DpbEntry`], supporting arbitrary
/// removal (the marking machine evicts pictures wherever they sit, not
/// just at the front).
#[derive(Debug)]
pub struct DpbFifo {
    buf: Vec<Option<DpbEntry>>,
    mask: usize,
    head: usize,
    len: usize,
}

impl DpbFifo {
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1).next_power_of_two();
        DpbFifo { buf: alloc::vec![None; cap], mask: cap - 1, head: 0, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn physical(&self, logical: usize) -> usize {
        (self.head + logical) & self.mask
    }

    pub fn get(&self, logical: usize) -> DpbEntry {
        self.buf[self.physical(logical)].expect("logical index within len")
    }

    pub fn set(&mut self, logical: usize, entry: DpbEntry) {
        let p = self.physical(logical);
        self.buf[p] = Some(entry);
    }

    pub fn push_back(&mut self, entry: DpbEntry) -> Result<()> {
        if self.len == self.buf.len() {
            return Err(Error::DataShapeProblem { msg: "DPB FIFO capacity exceeded" });
        }
        let idx = self.physical(self.len);
        self.buf[idx] = Some(entry);
        self.len += 1;
        Ok(())
    }

    /// Remove the entry at logical index `i`, shifting later entries back
    /// by one.
    pub fn remove_at(&mut self, i: usize) {
        for k in i..self.len - 1 {
            let from = self.physical(k + 1);
            let to = self.physical(k);
            self.buf[to] = self.buf[from];
        }
        let last = self.physical(self.len - 1);
        self.buf[last] = None;
        self.len -= 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = DpbEntry> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// `update_DPB(current_time)` (C.2.4.2): pop every not-used-for-reference
    /// entry whose `output_time` has already passed.
    pub fn expire_outputs(&mut self, current_time: u64) {
        let mut i = 0;
        while i < self.len {
            let e = self.get(i);
            if e.usage == PictureUsage::NotUsed && e.output_time <= current_time {
                self.remove_at(i);
            } else {
                i += 1;
            }
        }
    }
}

/// Adaptive reference picture marking operations (§8.2.5.4), processed in
/// order; an unrecognised opcode is a caller bug, not modelled here since
/// this type is exhaustive.
#[derive(Debug, Clone, Copy)]
pub enum AdaptiveMarkingOp {
    ShortTermToUnused { difference_of_pic_nums_minus1: u32 },
    LongTermToUnused { long_term_pic_num: u32 },
    ShortTermToLongTerm { difference_of_pic_nums_minus1: u32, long_term_frame_idx: u32 },
    SetMaxLongTermFrameIdx { max_long_term_frame_idx_plus1: u32 },
    ResetAll,
    CurrentToLongTerm { long_term_frame_idx: u32 },
}

/// Marking-machine counters maintained alongside the DPB FIFO.
#[derive(Debug, Clone, Copy)]
pub struct DpbMarkingState {
    pub num_short_term: u32,
    pub num_long_term: u32,
    /// `-1` means unset (`MaxLongTermFrameIdx = "no long-term frame
    /// indices"`).
    pub max_long_term_frame_idx: i64,
    pub max_num_ref_frames: u32,
    pub max_frame_num: u32,
}

impl DpbMarkingState {
    pub fn new(max_num_ref_frames: u32, max_frame_num: u32) -> Self {
        DpbMarkingState {
            num_short_term: 0,
            num_long_term: 0,
            max_long_term_frame_idx: -1,
            max_num_ref_frames,
            max_frame_num,
        }
    }

    fn ref_limit(&self) -> u32 {
        self.max_num_ref_frames.max(1)
    }
}

fn derive_pic_num(frame_num: u32, field_pic_flag: bool) -> u32 {
    if field_pic_flag {
        2 * frame_num + 1
    } else {
        frame_num
    }
}

/// Process one incoming picture's marking per §8.2.5, then insert it into
/// `dpb`. `new_entry.usage` is overwritten; callers should pass any value.
/// Enforces the `num_short_term + num_long_term ≤ max(max_num_ref_frames,1)`
/// invariant and the DPB size ceiling, returning the corresponding `Error`
/// on violation.
#[allow(clippy::too_many_arguments)]
pub fn mark_and_insert<S: DiagnosticSink>(
    dpb: &mut DpbFifo,
    state: &mut DpbMarkingState,
    mut new_entry: DpbEntry,
    idr_pic_flag: bool,
    sps_long_term_reference_flag: bool,
    adaptive_marking: Option<&[AdaptiveMarkingOp]>,
    dpb_size: u32,
    sink: &mut S,
) -> Result<()> {
    if idr_pic_flag {
        for i in 0..dpb.len() {
            let mut e = dpb.get(i);
            e.usage = PictureUsage::NotUsed;
            dpb.set(i, e);
        }
        state.num_short_term = 0;
        state.num_long_term = 0;
        state.max_long_term_frame_idx = -1;

        if sps_long_term_reference_flag {
            new_entry.usage = PictureUsage::LongTerm;
            new_entry.long_term_frame_idx = Some(0);
            state.max_long_term_frame_idx = 0;
            state.num_long_term += 1;
        } else {
            new_entry.usage = PictureUsage::ShortTerm;
            state.num_short_term += 1;
        }
    } else if let Some(ops) = adaptive_marking {
        let mut current_is_long_term = false;
        let pic_num = derive_pic_num(new_entry.frame_num, new_entry.field_pic_flag);

        for op in ops {
            match *op {
                AdaptiveMarkingOp::ShortTermToUnused { difference_of_pic_nums_minus1 } => {
                    let pic_num_x = pic_num.wrapping_sub(difference_of_pic_nums_minus1 + 1);
                    let mut found = false;
                    for i in 0..dpb.len() {
                        let e = dpb.get(i);
                        if e.usage == PictureUsage::ShortTerm && derive_pic_num(e.frame_num, e.field_pic_flag) == pic_num_x {
                            let mut e2 = e;
                            e2.usage = PictureUsage::NotUsed;
                            dpb.set(i, e2);
                            state.num_short_term -= 1;
                            found = true;
                            break;
                        }
                    }
                    if !found {
                        // Open Question (a): mirror the documented
                        // algorithm's `pic_num_X` derivation as-is and
                        // surface the mismatch as a diagnostic rather than
                        // an error.
                        sink.emit(
                            DiagnosticEvent::new(
                                DiagnosticLevel::Warning,
                                "dpb_marking",
                                "adaptive marking op 1: no short-term picture matches pic_num_X",
                            )
                            .with_rule("8.2.5.4.1")
                            .with_operands([Some(pic_num_x as i64), Some(pic_num as i64), None, None]),
                        );
                    }
                }
                AdaptiveMarkingOp::LongTermToUnused { long_term_pic_num } => {
                    for i in 0..dpb.len() {
                        let e = dpb.get(i);
                        if e.usage == PictureUsage::LongTerm && e.long_term_frame_idx == Some(long_term_pic_num) {
                            let mut e2 = e;
                            e2.usage = PictureUsage::NotUsed;
                            dpb.set(i, e2);
                            state.num_long_term -= 1;
                            break;
                        }
                    }
                }
                AdaptiveMarkingOp::ShortTermToLongTerm { difference_of_pic_nums_minus1, long_term_frame_idx } => {
                    let pic_num_x = pic_num.wrapping_sub(difference_of_pic_nums_minus1 + 1);
                    for i in 0..dpb.len() {
                        let e = dpb.get(i);
                        if e.usage == PictureUsage::LongTerm && e.long_term_frame_idx == Some(long_term_frame_idx) {
                            let mut e2 = e;
                            e2.usage = PictureUsage::NotUsed;
                            dpb.set(i, e2);
                            state.num_long_term -= 1;
                        }
                    }
                    for i in 0..dpb.len() {
                        let e = dpb.get(i);
                        if e.usage == PictureUsage::ShortTerm && derive_pic_num(e.frame_num, e.field_pic_flag) == pic_num_x {
                            let mut e2 = e;
                            e2.usage = PictureUsage::LongTerm;
                            e2.long_term_frame_idx = Some(long_term_frame_idx);
                            dpb.set(i, e2);
                            state.num_short_term -= 1;
                            state.num_long_term += 1;
                            break;
                        }
                    }
                }
                AdaptiveMarkingOp::SetMaxLongTermFrameIdx { max_long_term_frame_idx_plus1 } => {
                    let new_max = max_long_term_frame_idx_plus1 as i64 - 1;
                    // Open Question (b): the source's `update` short-circuit
                    // is never taken when `new >= old`, so the "mark
                    // exceeding long-term pictures unused" step is skipped
                    // unconditionally here; `max_long_term_frame_idx` is
                    // still recorded.
                    state.max_long_term_frame_idx = new_max;
                }
                AdaptiveMarkingOp::ResetAll => {
                    for i in 0..dpb.len() {
                        let mut e = dpb.get(i);
                        e.usage = PictureUsage::NotUsed;
                        dpb.set(i, e);
                    }
                    state.num_short_term = 0;
                    state.num_long_term = 0;
                    state.max_long_term_frame_idx = -1;
                }
                AdaptiveMarkingOp::CurrentToLongTerm { long_term_frame_idx } => {
                    for i in 0..dpb.len() {
                        let e = dpb.get(i);
                        if e.usage == PictureUsage::LongTerm && e.long_term_frame_idx == Some(long_term_frame_idx) {
                            let mut e2 = e;
                            e2.usage = PictureUsage::NotUsed;
                            dpb.set(i, e2);
                            state.num_long_term -= 1;
                        }
                    }
                    new_entry.usage = PictureUsage::LongTerm;
                    new_entry.long_term_frame_idx = Some(long_term_frame_idx);
                    state.num_long_term += 1;
                    current_is_long_term = true;
                }
            }
        }

        if !current_is_long_term {
            new_entry.usage = PictureUsage::ShortTerm;
            state.num_short_term += 1;
        }
    } else {
        // Sliding window (§8.2.5.3).
        if state.num_short_term + state.num_long_term >= state.ref_limit() && state.num_short_term > 0 {
            let mut min_wrap: Option<i64> = None;
            let mut min_idx: Option<usize> = None;
            for i in 0..dpb.len() {
                let e = dpb.get(i);
                if e.usage != PictureUsage::ShortTerm {
                    continue;
                }
                let wrap = if e.frame_num > new_entry.frame_num {
                    e.frame_num as i64 - state.max_frame_num as i64
                } else {
                    e.frame_num as i64
                };
                let better = match min_wrap {
                    None => true,
                    Some(m) => wrap < m,
                };
                if better {
                    min_wrap = Some(wrap);
                    min_idx = Some(i);
                }
            }
            if let Some(i) = min_idx {
                let mut e = dpb.get(i);
                e.usage = PictureUsage::NotUsed;
                dpb.set(i, e);
                state.num_short_term -= 1;
            }
        }
        new_entry.usage = PictureUsage::ShortTerm;
        state.num_short_term += 1;
    }

    dpb.push_back(new_entry)?;

    if state.num_short_term + state.num_long_term > state.ref_limit() {
        return Err(Error::DpbReferenceOverflow {
            count: state.num_short_term + state.num_long_term,
            limit: state.ref_limit(),
        });
    }
    if dpb.len() as u32 > dpb_size {
        return Err(Error::DpbSizeOverflow { count: dpb.len() as u32, dpb_size });
    }
    Ok(())
}
