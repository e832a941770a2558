//! Top-level HRD CPB/DPB conformance verifier, grounded on
//! `h264_hrd_verifier.c`'s `checkH264CpbHrdConformanceTests`/`processAUH264HrdContext`.

use crate::diagnostics::{DiagnosticEvent, DiagnosticLevel, DiagnosticSink};
use crate::error::{Error, Result};
use crate::hrd::cpb::{CpbEntry, CpbFifo};
use crate::hrd::dpb::{mark_and_insert, AdaptiveMarkingOp, DpbEntry, DpbFifo, DpbMarkingState, PictureUsage};
use crate::hrd::levels::{f_r, lookup_level, Profile, H264_BDAV_MAX_BITRATE, H264_BDAV_MAX_CPB_SIZE};

/// Static per-stream configuration, derived once from SPS/VUI at
/// initialisation (`initH264HrdContext`).
#[derive(Debug, Clone, Copy)]
pub struct HrdConfig {
    pub profile: Profile,
    pub level_idc: u8,
    /// `true` forces CBR arrival-time semantics (`T_a(n) = T_f(n-1)`).
    pub cbr: bool,
    pub time_scale: u32,
    pub num_units_in_tick: u32,
    /// `nal_hrd.BitRate[SchedSelIdx]`, bits/s.
    pub bitrate_bps: u64,
    /// `nal_hrd.CpbSize[SchedSelIdx]`, bits.
    pub cpb_size_bits: u64,
    pub pic_width_in_mbs: u32,
    pub frame_height_in_mbs: u32,
    pub max_num_ref_frames: u32,
    pub field_picture: bool,
    /// `log2_max_frame_num_minus4 + 4` from the SPS; drives
    /// `MaxFrameNum = 2^log2_max_frame_num` used by the DPB sliding-window
    /// `FrameNumWrap` derivation (§8.2.5.3).
    pub log2_max_frame_num: u32,
}

impl HrdConfig {
    /// `t_c = 90000 * num_units_in_tick`.
    pub fn tick_duration(&self) -> u64 {
        90_000u64 * self.num_units_in_tick as u64
    }

    pub fn pic_size_in_mbs(&self) -> u32 {
        self.pic_width_in_mbs * self.frame_height_in_mbs
    }

    /// `MaxFrameNum = 2^log2_max_frame_num`.
    pub fn max_frame_num(&self) -> u32 {
        1u32 << self.log2_max_frame_num.min(31)
    }

    /// `dpb_size = min(maxDpbMbs / PicSizeInMbs, 16)`.
    pub fn dpb_size(&self) -> Result<u32> {
        let limits = lookup_level(self.level_idc)
            .ok_or(Error::DataShapeProblem { msg: "unknown level_idc for Annex A lookup" })?;
        let pic_size = self.pic_size_in_mbs().max(1);
        Ok((limits.max_dpb_mbs / pic_size).min(16))
    }

    /// Initialisation-time bound check (A.3.1.j/A.3.3.g plus the BDAV
    /// absolute ceilings).
    pub fn validate_bounds(&self, nal_hrd_bitrate_last: u64, nal_hrd_cpb_size_last: u64) -> Result<()> {
        let limits = lookup_level(self.level_idc)
            .ok_or(Error::DataShapeProblem { msg: "unknown level_idc for Annex A lookup" })?;
        let (nal_factor, _vcl_factor) = self.profile.cpb_br_factors();
        let max_br_bps = limits.max_br as u64 * nal_factor as u64;
        let max_cpb_bits = limits.max_cpb as u64 * nal_factor as u64;

        if max_br_bps < nal_hrd_bitrate_last {
            return Err(Error::HrdTimingViolation {
                annex_rule: "A.3.1.j",
                operands: [Some(max_br_bps as i64), Some(nal_hrd_bitrate_last as i64)],
            });
        }
        if max_cpb_bits < nal_hrd_cpb_size_last {
            return Err(Error::HrdTimingViolation {
                annex_rule: "A.3.3.g",
                operands: [Some(max_cpb_bits as i64), Some(nal_hrd_cpb_size_last as i64)],
            });
        }
        if nal_hrd_bitrate_last > H264_BDAV_MAX_BITRATE {
            return Err(Error::HrdTimingViolation {
                annex_rule: "BDAV.bitrate",
                operands: [Some(H264_BDAV_MAX_BITRATE as i64), Some(nal_hrd_bitrate_last as i64)],
            });
        }
        if nal_hrd_cpb_size_last > H264_BDAV_MAX_CPB_SIZE {
            return Err(Error::HrdTimingViolation {
                annex_rule: "BDAV.cpb_size",
                operands: [Some(H264_BDAV_MAX_CPB_SIZE as i64), Some(nal_hrd_cpb_size_last as i64)],
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct PrevAu {
    t_r: u64,
    t_f: u64,
    initial_cpb_removal_delay: u64,
    initial_cpb_removal_delay_offset: u64,
    pic_size_in_mbs: u32,
    level_idc: u8,
}

/// One access unit's worth of input to `process_au`.
#[derive(Debug, Clone)]
pub struct AuInput {
    pub au_idx: u64,
    pub length_bits: u64,
    pub cpb_removal_delay: u32,
    pub is_buffering_period: bool,
    pub initial_cpb_removal_delay: u64,
    pub initial_cpb_removal_delay_offset: u64,
    pub frame_num: u32,
    pub field_pic_flag: bool,
    pub bottom_field_flag: bool,
    pub idr_pic_flag: bool,
    pub sps_long_term_reference_flag: bool,
    pub adaptive_marking: Option<alloc::vec::Vec<AdaptiveMarkingOp>>,
    pub dpb_output_delay_ticks: u64,
}

/// The stateful verifier: CPB FIFO, DPB FIFO + marking state, and the
/// previous access unit's remembered fields (`process_AU`'s static locals).
pub struct HrdVerifier {
    config: HrdConfig,
    cpb: CpbFifo,
    dpb: DpbFifo,
    marking: DpbMarkingState,
    clock_time: u64,
    prev: Option<PrevAu>,
}

const H264_MAX_AU_IN_CPB: usize = 32;

impl HrdVerifier {
    pub fn new(config: HrdConfig) -> Result<Self> {
        let dpb_size = config.dpb_size()?;
        let marking = DpbMarkingState::new(config.max_num_ref_frames, config.max_frame_num());
        Ok(HrdVerifier {
            config,
            cpb: CpbFifo::new(H264_MAX_AU_IN_CPB),
            dpb: DpbFifo::new((dpb_size as usize).max(1)),
            marking,
            clock_time: 0,
            prev: None,
        })
    }

    fn bitrate_per_tick_num_den(&self) -> (u128, u128) {
        // bitrate = BitRate / (90000 * time_scale), in bits per clock tick.
        (self.config.bitrate_bps as u128, 90_000u128 * self.config.time_scale as u128)
    }

    /// Process one access unit in clock-time order, per SPEC_FULL.md §4.9.
    pub fn process_au<S: DiagnosticSink>(&mut self, au: &AuInput, sink: &mut S) -> Result<()> {
        let t_r = self.compute_t_r(au);
        let t_a = self.compute_t_a(au, t_r);
        let t_f = self.compute_t_f(t_a, au.length_bits);

        if t_r < t_f {
            return Err(Error::CpbUnderflow { removal_time: t_r, final_arrival_time: t_f });
        }

        if let Some(prev) = self.prev {
            self.check_c15_c16(au, prev, t_r, sink);
            self.check_a311_a321(prev, t_r, sink)?;
        }

        // CPB removal loop: drain entries whose removal_time has arrived.
        while let Some(front) = self.cpb.front() {
            if front.removal_time > t_f {
                break;
            }
            self.clock_time = self.clock_time.max(front.removal_time);
            self.cpb.pop_front();

            let occupancy = self.cpb.occupancy_bits();
            if occupancy > self.config.cpb_size_bits {
                return Err(Error::CpbOverflow { occupancy_bits: occupancy, cpb_size_bits: self.config.cpb_size_bits });
            }

            self.transfer_to_dpb(front, sink)?;
        }

        self.cpb.push_back(CpbEntry {
            au_idx: au.au_idx,
            length_bits: au.length_bits,
            removal_time: t_r,
            frame_num: au.frame_num,
            field_pic_flag: au.field_pic_flag,
            bottom_field_flag: au.bottom_field_flag,
            idr_pic_flag: au.idr_pic_flag,
            sps_long_term_reference_flag: au.sps_long_term_reference_flag,
            adaptive_marking: au.adaptive_marking.clone(),
            dpb_output_delay_ticks: au.dpb_output_delay_ticks,
        })?;
        self.clock_time = self.clock_time.max(t_f);

        self.prev = Some(PrevAu {
            t_r,
            t_f,
            initial_cpb_removal_delay: au.initial_cpb_removal_delay,
            initial_cpb_removal_delay_offset: au.initial_cpb_removal_delay_offset,
            pic_size_in_mbs: self.config.pic_size_in_mbs(),
            level_idc: self.config.level_idc,
        });
        Ok(())
    }

    fn compute_t_r(&self, au: &AuInput) -> u64 {
        match self.prev {
            None => au.initial_cpb_removal_delay * 90_000 / self.config.time_scale.max(1) as u64,
            Some(prev) => {
                if au.is_buffering_period {
                    au.initial_cpb_removal_delay * 90_000 / self.config.time_scale.max(1) as u64
                } else {
                    prev.t_r + self.config.tick_duration() * au.cpb_removal_delay as u64
                }
            }
        }
    }

    fn compute_t_a(&self, au: &AuInput, t_r: u64) -> u64 {
        let prev_t_f = self.prev.map(|p| p.t_f).unwrap_or(0);
        if self.config.cbr {
            return prev_t_f;
        }
        let offset = 90_000u64
            * (au.initial_cpb_removal_delay + au.initial_cpb_removal_delay_offset)
            / self.config.time_scale.max(1) as u64;
        let earliest = t_r.saturating_sub(offset);
        prev_t_f.max(earliest)
    }

    fn compute_t_f(&self, t_a: u64, length_bits: u64) -> u64 {
        let (num, den) = self.bitrate_per_tick_num_den();
        if num == 0 {
            return t_a;
        }
        // length_bits / (num/den) ticks = length_bits * den / num.
        let duration = (length_bits as u128 * den) / num;
        t_a + duration as u64
    }

    /// §C-15/C-16.
    fn check_c15_c16<S: DiagnosticSink>(&self, au: &AuInput, prev: PrevAu, t_r: u64, sink: &mut S) {
        let delta_tg90 = ((t_r as i64 - prev.t_f as i64).max(0) as u64 * 90_000) / self.config.time_scale.max(1) as u64;
        let ceil_ok = delta_tg90 >= au.initial_cpb_removal_delay;
        if !ceil_ok {
            sink.emit(
                DiagnosticEvent::new(DiagnosticLevel::Warning, "hrd", "C-15 violated: delta_tg90 < initial_cpb_removal_delay")
                    .with_rule("C-15")
                    .with_operands([Some(delta_tg90 as i64), Some(au.initial_cpb_removal_delay as i64), None, None]),
            );
        }
        if self.config.cbr && au.initial_cpb_removal_delay < delta_tg90 {
            sink.emit(
                DiagnosticEvent::new(DiagnosticLevel::Warning, "hrd", "C-16 violated under CBR")
                    .with_rule("C-16")
                    .with_operands([Some(au.initial_cpb_removal_delay as i64), Some(delta_tg90 as i64), None, None]),
            );
        }
    }

    /// §A.3.1.a/A.3.2.a.
    fn check_a311_a321<S: DiagnosticSink>(&self, prev: PrevAu, t_r: u64, sink: &mut S) -> Result<()> {
        let limits = lookup_level(prev.level_idc)
            .ok_or(Error::DataShapeProblem { msg: "unknown level_idc for Annex A lookup" })?;
        let (fr_num, fr_den) = f_r(prev.level_idc, self.config.field_picture);
        let rate_bound_ticks = {
            let mbps_bound = prev.pic_size_in_mbs as u64 * self.config.time_scale.max(1) as u64
                / limits.max_mbps.max(1) as u64;
            let fr_bound = fr_num as u64 * self.config.time_scale.max(1) as u64 / fr_den as u64;
            mbps_bound.max(fr_bound)
        };
        if t_r < prev.t_r + rate_bound_ticks {
            sink.emit(
                DiagnosticEvent::new(DiagnosticLevel::Warning, "hrd", "A.3.1.a/A.3.2.a spacing violated")
                    .with_rule("A.3.1.a")
                    .with_operands([Some(t_r as i64 - prev.t_r as i64), Some(rate_bound_ticks as i64), None, None]),
            );
        }
        Ok(())
    }

    /// Transfers a picture popped off the CPB into the DPB, marking it per
    /// §8.2.5 using *that picture's own* fields — never the fields of
    /// whichever access unit happens to be current when it is popped.
    fn transfer_to_dpb<S: DiagnosticSink>(&mut self, cpb_entry: CpbEntry, sink: &mut S) -> Result<()> {
        let entry = DpbEntry {
            au_idx: cpb_entry.au_idx,
            frame_display_num: cpb_entry.au_idx,
            frame_num: cpb_entry.frame_num,
            field_pic_flag: cpb_entry.field_pic_flag,
            bottom_field_flag: cpb_entry.bottom_field_flag,
            long_term_frame_idx: None,
            output_time: self.clock_time + cpb_entry.dpb_output_delay_ticks,
            usage: PictureUsage::NotUsed,
        };
        self.dpb.expire_outputs(self.clock_time);
        let dpb_size = self.config.dpb_size()?;
        mark_and_insert(
            &mut self.dpb,
            &mut self.marking,
            entry,
            cpb_entry.idr_pic_flag,
            cpb_entry.sps_long_term_reference_flag,
            cpb_entry.adaptive_marking.as_deref(),
            dpb_size,
            sink,
        )
    }

    /// Drains every access unit still sitting in the CPB through the DPB,
    /// in removal-time (FIFO) order. Without this, the last
    /// `H264_MAX_AU_IN_CPB` pictures of a stream are never marked into the
    /// DPB, since `process_au`'s removal loop only drains entries whose
    /// `removal_time` has been reached by a *later* access unit's `t_f`.
    /// Call once after the final `process_au`.
    pub fn finish<S: DiagnosticSink>(&mut self, sink: &mut S) -> Result<()> {
        for entry in self.cpb.drain() {
            self.clock_time = self.clock_time.max(entry.removal_time);
            self.transfer_to_dpb(entry, sink)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;

    fn base_config() -> HrdConfig {
        HrdConfig {
            profile: Profile::High,
            level_idc: 40,
            cbr: false,
            time_scale: 30_000,
            num_units_in_tick: 1001,
            bitrate_bps: 20_000_000,
            cpb_size_bits: 25_000_000 * 8,
            pic_width_in_mbs: 120,
            frame_height_in_mbs: 68,
            max_num_ref_frames: 4,
            field_picture: false,
            log2_max_frame_num: 4,
        }
    }

    #[test]
    fn dpb_size_matches_annex_a_formula() {
        let cfg = base_config();
        let expected = (245_760u32 / (120 * 68)).min(16);
        assert_eq!(cfg.dpb_size().unwrap(), expected);
    }

    #[test]
    fn t_r_formula_first_and_second_au() {
        // Formula per SPEC_FULL.md §4.9: T_r(0) = initial_cpb_removal_delay
        // * 90000 / time_scale; T_r(n) = T_r(n_b) + t_c * cpb_removal_delay.
        let cfg = HrdConfig { time_scale: 30_000, num_units_in_tick: 1001, ..base_config() };
        let mut v = HrdVerifier::new(cfg).unwrap();
        let au0 = AuInput {
            au_idx: 0,
            length_bits: 1000,
            cpb_removal_delay: 0,
            is_buffering_period: true,
            initial_cpb_removal_delay: 27_000,
            initial_cpb_removal_delay_offset: 0,
            frame_num: 0,
            field_pic_flag: false,
            bottom_field_flag: false,
            idr_pic_flag: true,
            sps_long_term_reference_flag: false,
            adaptive_marking: None,
            dpb_output_delay_ticks: 0,
        };
        let expected_t_r0 = 27_000u64 * 90_000 / 30_000;
        v.process_au(&au0, &mut NullSink).unwrap();
        assert_eq!(v.prev.unwrap().t_r, expected_t_r0);

        let au1 = AuInput {
            au_idx: 1,
            length_bits: 1000,
            cpb_removal_delay: 2,
            is_buffering_period: false,
            initial_cpb_removal_delay: 27_000,
            initial_cpb_removal_delay_offset: 0,
            frame_num: 1,
            field_pic_flag: false,
            bottom_field_flag: false,
            idr_pic_flag: false,
            sps_long_term_reference_flag: false,
            adaptive_marking: None,
            dpb_output_delay_ticks: 0,
        };
        let expected_t_r1 = expected_t_r0 + (90_000u64 * 1001) * 2;
        v.process_au(&au1, &mut NullSink).unwrap();
        assert_eq!(v.prev.unwrap().t_r, expected_t_r1);
    }

    #[test]
    fn underflow_detected_when_removal_precedes_arrival() {
        let cfg = HrdConfig { bitrate_bps: 1, ..base_config() };
        let mut v = HrdVerifier::new(cfg).unwrap();
        let au0 = AuInput {
            au_idx: 0,
            length_bits: 10_000_000,
            cpb_removal_delay: 0,
            is_buffering_period: true,
            initial_cpb_removal_delay: 1,
            initial_cpb_removal_delay_offset: 0,
            frame_num: 0,
            field_pic_flag: false,
            bottom_field_flag: false,
            idr_pic_flag: true,
            sps_long_term_reference_flag: false,
            adaptive_marking: None,
            dpb_output_delay_ticks: 0,
        };
        let err = v.process_au(&au0, &mut NullSink);
        assert!(matches!(err, Err(Error::CpbUnderflow { .. })));
    }

    #[test]
    fn bounds_validation_rejects_bitrate_over_bdav_ceiling() {
        let cfg = base_config();
        assert!(cfg.validate_bounds(H264_BDAV_MAX_BITRATE + 1, 1).is_err());
        assert!(cfg.validate_bounds(1_000_000, 1_000_000).is_ok());
    }

    fn au(au_idx: u64, frame_num: u32, idr: bool, is_bp: bool, cpb_removal_delay: u32) -> AuInput {
        AuInput {
            au_idx,
            // Kept tiny so removal-time arithmetic stays comfortably clear
            // of a CPB underflow at this bitrate/tick configuration.
            length_bits: 1,
            cpb_removal_delay,
            is_buffering_period: is_bp,
            initial_cpb_removal_delay: 27_000,
            initial_cpb_removal_delay_offset: 0,
            frame_num,
            field_pic_flag: false,
            bottom_field_flag: false,
            idr_pic_flag: idr,
            sps_long_term_reference_flag: false,
            adaptive_marking: None,
            dpb_output_delay_ticks: 0,
        }
    }

    /// Each picture popped off the CPB must carry its own frame_num/idr
    /// flag into the DPB marking machine, not the fields of whichever AU
    /// happens to be current at the moment it is drained. au0's removal
    /// time is reached during au1's own `process_au` call, so au0 drains
    /// while au1 is the "current" AU; if the transfer wrongly used au1's
    /// fields, au0's DPB entry would carry au1's frame_num and skip the
    /// IDR reset it is actually entitled to.
    #[test]
    fn cpb_to_dpb_transfer_uses_popped_picture_own_fields() {
        let mut v = HrdVerifier::new(base_config()).unwrap();
        v.process_au(&au(0, 0, true, true, 0), &mut NullSink).unwrap();
        v.process_au(&au(1, 1, false, false, 1), &mut NullSink).unwrap();

        assert_eq!(v.dpb.len(), 1, "au0 should have drained into the DPB during au1's call");
        let transferred = v.dpb.get(0);
        assert_eq!(transferred.frame_num, 0, "must carry au0's own frame_num, not au1's");
        assert_eq!(transferred.usage, PictureUsage::ShortTerm);
        assert_eq!(v.marking.num_short_term, 1);
    }

    /// `finish()` must drain every access unit still sitting in the CPB
    /// through the DPB; without it the final pictures of a stream are
    /// never marked or checked against the DPB size ceiling.
    #[test]
    fn finish_flushes_remaining_cpb_entries_to_dpb() {
        let mut v = HrdVerifier::new(base_config()).unwrap();
        v.process_au(&au(0, 0, true, true, 0), &mut NullSink).unwrap();
        assert_eq!(v.dpb.len(), 0, "the only AU so far should still be sitting in the CPB");

        v.finish(&mut NullSink).unwrap();
        assert_eq!(v.dpb.len(), 1);
        assert!(v.cpb.is_empty());
    }
}
