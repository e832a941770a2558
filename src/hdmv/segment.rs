//! Deterministic HDMV segment writer, grounded on `hdmv_builder.c`.
//!
//! The builder keeps a scratch byte buffer sized by a reserve-then-write
//! discipline mirroring `_reqBufSizeCtx`/`_writeBytesCtx`/
//! `_writeCtxBufferOnOutput`: callers `reserve(n)` before any `emit`, and
//! `flush` hands the accumulated bytes to a caller-owned sink and resets.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::hdmv::constants::*;
use crate::object_codec::{self, HdmvObject};
use crate::palette::Palette;
use crate::rect::Rect;

fn next_pow2(x: usize) -> Option<usize> {
    if x == 0 {
        return Some(1);
    }
    x.checked_next_power_of_two()
}

/// The segment-builder scratch buffer (`HdmvBuilderContext`).
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    data: Vec<u8>,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        SegmentBuilder { data: Vec::new() }
    }

    /// Grow the buffer's capacity to the next power of two at or above
    /// `used + n`. Fails `SizeOverflow` if that would overflow `usize`.
    pub fn reserve(&mut self, n: usize) -> Result<()> {
        let total = self.data.len().checked_add(n).ok_or(Error::SizeOverflow)?;
        let target_cap = next_pow2(total).ok_or(Error::SizeOverflow)?;
        if target_cap > self.data.capacity() {
            self.data.reserve(target_cap - self.data.len());
        }
        Ok(())
    }

    pub fn emit(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Hand the accumulated bytes to `sink` and reset the buffer.
    pub fn flush<W: FnMut(&[u8]) -> Result<()>>(&mut self, mut sink: W) -> Result<()> {
        if !self.data.is_empty() {
            sink(&self.data)?;
        }
        self.data.clear();
        Ok(())
    }

    pub fn used(&self) -> usize {
        self.data.len()
    }
}

fn write_segment_header(buf: &mut SegmentBuilder, segment_type: u8, length: usize) -> Result<()> {
    if length > HDMV_MAX_SIZE_SEGMENT_PAYLOAD {
        return Err(Error::DataShapeProblem { msg: "segment payload exceeds 0xFFFF bytes" });
    }
    buf.emit(&[segment_type, (length >> 8) as u8, length as u8]);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct VideoDescriptor {
    pub video_width: u16,
    pub video_height: u16,
    pub frame_rate_id: u8,
}

fn write_video_descriptor(buf: &mut SegmentBuilder, vd: VideoDescriptor) {
    buf.emit(&[
        (vd.video_width >> 8) as u8,
        vd.video_width as u8,
        (vd.video_height >> 8) as u8,
        vd.video_height as u8,
        vd.frame_rate_id << 4,
    ]);
}

#[derive(Debug, Clone, Copy)]
pub struct CompositionDescriptor {
    pub composition_number: u16,
    pub composition_state: u8,
}

fn write_composition_descriptor(buf: &mut SegmentBuilder, cd: CompositionDescriptor) {
    buf.emit(&[
        (cd.composition_number >> 8) as u8,
        cd.composition_number as u8,
        cd.composition_state << 6,
    ]);
}

fn write_sequence_descriptor(buf: &mut SegmentBuilder, first: bool, last: bool) {
    buf.emit(&[((first as u8) << 7) | ((last as u8) << 6)]);
}

/// ### Palette Definition Segment (0x14)

fn palette_entries_size(palette: &Palette) -> usize {
    palette.nb_entries_in_use() * HDMV_SIZE_PALETTE_DEFINITION_ENTRY
}

fn write_pds(buf: &mut SegmentBuilder, palette_id: u8, palette: &Palette) -> Result<()> {
    let entries_size = palette_entries_size(palette);
    let payload_len = HDMV_SIZE_PALETTE_DESCRIPTOR + entries_size;
    write_segment_header(buf, HDMV_SEGMENT_TYPE_PDS, payload_len)?;
    buf.emit(&[palette_id, palette.version]);
    for (id, entry) in palette.in_use_entries() {
        // Wire order per SPEC_FULL.md §6: [id][Y][Cr][Cb][T].
        buf.emit(&[id, entry.ycbcr[0], entry.ycbcr[2], entry.ycbcr[1], entry.ycbcr[3]]);
    }
    Ok(())
}

/// Compute the total byte size of the PDS family for `palettes` before any
/// writing happens (`_computeSizePDS`), so a single `reserve` precedes the
/// writes.
pub fn compute_size_pds_family(palettes: &[(u8, &Palette)]) -> usize {
    palettes
        .iter()
        .map(|(_, p)| HDMV_SIZE_SEGMENT_HEADER + HDMV_SIZE_PALETTE_DESCRIPTOR + palette_entries_size(p))
        .sum()
}

pub fn write_pds_segments(buf: &mut SegmentBuilder, palettes: &[(u8, &Palette)]) -> Result<()> {
    let total = compute_size_pds_family(palettes);
    if total == 0 {
        return Ok(());
    }
    buf.reserve(total)?;
    for &(id, palette) in palettes {
        write_pds(buf, id, palette)?;
    }
    Ok(())
}

/// ### Object Definition Segment (0x15), fragmented

fn object_data_size(rle_size: usize) -> usize {
    7 + rle_size // 24-bit length + 16-bit width + 16-bit height + RLE bytes
}

pub fn compute_size_ods_family(objects: &[&HdmvObject]) -> usize {
    objects
        .iter()
        .map(|obj| {
            let objdef_size = object_data_size(obj.rle.len());
            let nb_seg = objdef_size / HDMV_MAX_SIZE_OBJECT_DEFINITION_FRAGMENT;
            let extra = objdef_size % HDMV_MAX_SIZE_OBJECT_DEFINITION_FRAGMENT;
            let mut size = nb_seg * HDMV_MAX_SIZE_SEGMENT;
            if extra > 0 {
                size += HDMV_SIZE_OD_SEGMENT_HEADER + HDMV_SIZE_SEGMENT_HEADER + extra;
            }
            size
        })
        .sum()
}

pub fn write_ods_segments(buf: &mut SegmentBuilder, objects: &[&HdmvObject]) -> Result<()> {
    let total = compute_size_ods_family(objects);
    if total == 0 {
        return Ok(());
    }
    buf.reserve(total)?;

    for obj in objects {
        let object_data = object_codec::build_object_data(&obj.palletised_bitmap, &obj.rle);
        let mut remaining = object_data.as_slice();
        let mut first = true;
        while !remaining.is_empty() {
            let frag_len = remaining.len().min(HDMV_MAX_SIZE_OBJECT_DEFINITION_FRAGMENT);
            let (frag, rest) = remaining.split_at(frag_len);
            let last = rest.is_empty();

            write_segment_header(buf, HDMV_SEGMENT_TYPE_ODS, HDMV_SIZE_OD_SEGMENT_HEADER + frag_len)?;
            buf.emit(&[
                (obj.descriptor.object_id >> 8) as u8,
                obj.descriptor.object_id as u8,
                obj.descriptor.version,
            ]);
            write_sequence_descriptor(buf, first, last);
            buf.emit(frag);

            remaining = rest;
            first = false;
        }
    }
    Ok(())
}

/// ### Presentation Composition Segment (0x16)

#[derive(Debug, Clone, Copy)]
pub struct CompositionObject {
    pub object_id_ref: u16,
    pub window_id_ref: u8,
    pub h_pos: u16,
    pub v_pos: u16,
    pub cropping: Option<Rect>,
}

fn composition_object_size(obj: &CompositionObject) -> usize {
    HDMV_SIZE_COMPOSITION_OBJECT_BASE
        + if obj.cropping.is_some() { HDMV_SIZE_COMPOSITION_OBJECT_CROPPED_EXTRA } else { 0 }
}

fn write_composition_object(buf: &mut SegmentBuilder, obj: &CompositionObject) {
    buf.emit(&[
        (obj.object_id_ref >> 8) as u8,
        obj.object_id_ref as u8,
        obj.window_id_ref,
        (obj.cropping.is_some() as u8) << 7,
        (obj.h_pos >> 8) as u8,
        obj.h_pos as u8,
        (obj.v_pos >> 8) as u8,
        obj.v_pos as u8,
    ]);
    if let Some(c) = obj.cropping {
        buf.emit(&[
            (c.x >> 8) as u8,
            c.x as u8,
            (c.y >> 8) as u8,
            c.y as u8,
            (c.w >> 8) as u8,
            c.w as u8,
            (c.h >> 8) as u8,
            c.h as u8,
        ]);
    }
}

#[derive(Debug, Clone)]
pub struct PresentationComposition {
    pub palette_update_flag: bool,
    pub palette_id_ref: u8,
    pub composition_objects: alloc::vec::Vec<CompositionObject>,
}

fn compute_size_pcs(video_descriptor_and_headers: usize, pc: &PresentationComposition) -> usize {
    video_descriptor_and_headers
        + HDMV_SIZE_PRESENTATION_COMPOSITION_HEADER
        + pc.composition_objects.iter().map(composition_object_size).sum::<usize>()
}

pub fn write_pcs(
    buf: &mut SegmentBuilder,
    video_descriptor: VideoDescriptor,
    composition_descriptor: CompositionDescriptor,
    pc: &PresentationComposition,
) -> Result<()> {
    let headers = HDMV_SIZE_VIDEO_DESCRIPTOR + HDMV_SIZE_COMPOSITION_DESCRIPTOR;
    let payload_len = compute_size_pcs(headers, pc);
    buf.reserve(HDMV_SIZE_SEGMENT_HEADER + payload_len)?;

    write_segment_header(buf, HDMV_SEGMENT_TYPE_PCS, payload_len)?;
    write_video_descriptor(buf, video_descriptor);
    write_composition_descriptor(buf, composition_descriptor);
    buf.emit(&[
        (pc.palette_update_flag as u8) << 7,
        pc.palette_id_ref,
        pc.composition_objects.len() as u8,
    ]);
    for obj in &pc.composition_objects {
        write_composition_object(buf, obj);
    }
    Ok(())
}

/// ### Window Definition Segment (0x17)

#[derive(Debug, Clone, Copy)]
pub struct WindowInfo {
    pub window_id: u8,
    pub rect: Rect,
}

pub fn write_wds(buf: &mut SegmentBuilder, windows: &[WindowInfo]) -> Result<()> {
    let payload_len = 1 + windows.len() * HDMV_SIZE_WINDOW_INFO;
    buf.reserve(HDMV_SIZE_SEGMENT_HEADER + payload_len)?;
    write_segment_header(buf, HDMV_SEGMENT_TYPE_WDS, payload_len)?;
    buf.emit(&[windows.len() as u8]);
    for w in windows {
        buf.emit(&[
            w.window_id,
            (w.rect.x >> 8) as u8,
            w.rect.x as u8,
            (w.rect.y >> 8) as u8,
            w.rect.y as u8,
            (w.rect.w >> 8) as u8,
            w.rect.w as u8,
            (w.rect.h >> 8) as u8,
            w.rect.h as u8,
        ]);
    }
    Ok(())
}

/// ### End Segment (0x80)

pub fn write_end_segment(buf: &mut SegmentBuilder) -> Result<()> {
    buf.reserve(HDMV_SIZE_SEGMENT_HEADER)?;
    write_segment_header(buf, HDMV_SEGMENT_TYPE_END, 0)
}

/// ### Interactive Composition Segment (0x18), fragmented
///
/// Encode side only (`_appendEffectSequence`/`_appendPage`/`_appendButton*`):
/// nothing in this crate ever parses an ICS back out of a stream.

#[derive(Debug, Clone)]
pub struct EffectSequence {
    pub effects: alloc::vec::Vec<Effect>,
}

#[derive(Debug, Clone)]
pub struct Effect {
    pub effect_duration: u32, // 24-bit
    pub palette_id: u16,
    pub composition_objects: alloc::vec::Vec<CompositionObject>,
}

fn effect_size(effect: &Effect) -> usize {
    HDMV_SIZE_EFFECT_HEADER + effect.composition_objects.iter().map(composition_object_size).sum::<usize>()
}

fn effect_sequence_size(seq: &EffectSequence) -> usize {
    1 + seq.effects.iter().map(effect_size).sum::<usize>()
}

fn write_effect_sequence(buf: &mut SegmentBuilder, seq: &EffectSequence) {
    buf.emit(&[seq.effects.len() as u8]);
    for effect in &seq.effects {
        buf.emit(&[
            (effect.effect_duration >> 16) as u8,
            (effect.effect_duration >> 8) as u8,
            effect.effect_duration as u8,
            (effect.palette_id >> 8) as u8,
            effect.palette_id as u8,
            effect.composition_objects.len() as u8,
        ]);
        for obj in &effect.composition_objects {
            write_composition_object(buf, obj);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeighborInfo {
    pub upper_button_id_ref: u16,
    pub lower_button_id_ref: u16,
    pub left_button_id_ref: u16,
    pub right_button_id_ref: u16,
}

fn write_neighbor_info(buf: &mut SegmentBuilder, n: &NeighborInfo) {
    for v in [n.upper_button_id_ref, n.lower_button_id_ref, n.left_button_id_ref, n.right_button_id_ref] {
        buf.emit(&[(v >> 8) as u8, v as u8]);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalStateInfo {
    pub start_object_id_ref: u16,
    pub end_object_id_ref: u16,
    pub repeat_flag: bool,
}

fn write_normal_state_info(buf: &mut SegmentBuilder, s: &NormalStateInfo) {
    buf.emit(&[
        (s.start_object_id_ref >> 8) as u8,
        s.start_object_id_ref as u8,
        (s.end_object_id_ref >> 8) as u8,
        s.end_object_id_ref as u8,
        (s.repeat_flag as u8) << 7,
    ]);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectedStateInfo {
    pub palette_id_ref: u8,
    pub start_object_id_ref: u16,
    pub end_object_id_ref: u16,
    pub repeat_flag: bool,
}

fn write_selected_state_info(buf: &mut SegmentBuilder, s: &SelectedStateInfo) {
    buf.emit(&[
        s.palette_id_ref,
        (s.start_object_id_ref >> 8) as u8,
        s.start_object_id_ref as u8,
        (s.end_object_id_ref >> 8) as u8,
        s.end_object_id_ref as u8,
        (s.repeat_flag as u8) << 7,
    ]);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActivatedStateInfo {
    pub start_object_id_ref: u16,
    pub end_object_id_ref: u16,
}

fn write_activated_state_info(buf: &mut SegmentBuilder, s: &ActivatedStateInfo) {
    buf.emit(&[
        (s.start_object_id_ref >> 8) as u8,
        s.start_object_id_ref as u8,
        (s.end_object_id_ref >> 8) as u8,
        s.end_object_id_ref as u8,
    ]);
}

/// `[u32 opcode][u32 destination][u32 source]`.
#[derive(Debug, Clone, Copy)]
pub struct NavigationCommand {
    pub opcode: u32,
    pub destination: u32,
    pub source: u32,
}

fn write_navigation_command(buf: &mut SegmentBuilder, c: &NavigationCommand) {
    buf.emit(&c.opcode.to_be_bytes());
    buf.emit(&c.destination.to_be_bytes());
    buf.emit(&c.source.to_be_bytes());
}

#[derive(Debug, Clone)]
pub struct Button {
    pub button_id: u16,
    pub button_numeric_select_value: u16,
    pub auto_action_flag: bool,
    pub neighbor_info: NeighborInfo,
    pub normal_state_info: NormalStateInfo,
    pub selected_state_info: SelectedStateInfo,
    pub activated_state_info: ActivatedStateInfo,
    pub navigation_commands: alloc::vec::Vec<NavigationCommand>,
}

fn button_size(b: &Button) -> usize {
    2 + 2 + 1
        + HDMV_SIZE_BUTTON_NEIGHBOR_INFO
        + HDMV_SIZE_BUTTON_NORMAL_STATE_INFO
        + HDMV_SIZE_BUTTON_SELECTED_STATE_INFO
        + HDMV_SIZE_BUTTON_ACTIVATED_STATE_INFO
        + 2
        + b.navigation_commands.len() * HDMV_SIZE_NAVIGATION_COMMAND
}

fn write_button(buf: &mut SegmentBuilder, b: &Button) {
    buf.emit(&[
        (b.button_id >> 8) as u8,
        b.button_id as u8,
        (b.button_numeric_select_value >> 8) as u8,
        b.button_numeric_select_value as u8,
        (b.auto_action_flag as u8) << 7,
    ]);
    write_neighbor_info(buf, &b.neighbor_info);
    write_normal_state_info(buf, &b.normal_state_info);
    write_selected_state_info(buf, &b.selected_state_info);
    write_activated_state_info(buf, &b.activated_state_info);
    buf.emit(&[(b.navigation_commands.len() >> 8) as u8, b.navigation_commands.len() as u8]);
    for cmd in &b.navigation_commands {
        write_navigation_command(buf, cmd);
    }
}

#[derive(Debug, Clone)]
pub struct ButtonOverlapGroup {
    pub default_valid_button_id_ref: u16,
    pub buttons: alloc::vec::Vec<Button>,
}

fn bog_size(bog: &ButtonOverlapGroup) -> usize {
    3 + bog.buttons.iter().map(button_size).sum::<usize>()
}

fn write_bog(buf: &mut SegmentBuilder, bog: &ButtonOverlapGroup) {
    buf.emit(&[
        (bog.default_valid_button_id_ref >> 8) as u8,
        bog.default_valid_button_id_ref as u8,
        bog.buttons.len() as u8,
    ]);
    for b in &bog.buttons {
        write_button(buf, b);
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub page_id: u8,
    pub page_version: u8,
    pub uo_mask: u64,
    pub in_effects: EffectSequence,
    pub out_effects: EffectSequence,
    pub animation_frame_rate_code: u8,
    pub default_selected_button_id_ref: u16,
    pub default_activated_button_id_ref: u16,
    pub palette_id_ref: u8,
    pub bogs: alloc::vec::Vec<ButtonOverlapGroup>,
}

fn page_size(p: &Page) -> usize {
    1 + 1
        + 8
        + effect_sequence_size(&p.in_effects)
        + effect_sequence_size(&p.out_effects)
        + 1 + 2 + 2 + 1 + 1
        + p.bogs.iter().map(bog_size).sum::<usize>()
}

fn write_page(buf: &mut SegmentBuilder, p: &Page) {
    buf.emit(&[p.page_id, p.page_version]);
    buf.emit(&p.uo_mask.to_be_bytes());
    write_effect_sequence(buf, &p.in_effects);
    write_effect_sequence(buf, &p.out_effects);
    buf.emit(&[
        p.animation_frame_rate_code,
        (p.default_selected_button_id_ref >> 8) as u8,
        p.default_selected_button_id_ref as u8,
        (p.default_activated_button_id_ref >> 8) as u8,
        p.default_activated_button_id_ref as u8,
        p.palette_id_ref,
        p.bogs.len() as u8,
    ]);
    for bog in &p.bogs {
        write_bog(buf, bog);
    }
}

#[derive(Debug, Clone)]
pub struct InteractiveComposition {
    pub stream_model_multiplexed: bool,
    pub user_interface_model_popup: bool,
    pub composition_time_out_pts: Option<u64>,
    pub selection_time_out_pts: Option<u64>,
    pub user_time_out_duration: u32, // 24-bit
    pub pages: alloc::vec::Vec<Page>,
}

fn interactive_composition_body_size(ic: &InteractiveComposition) -> usize {
    let timeouts = if ic.stream_model_multiplexed { 1 + 5 + 1 + 5 } else { 0 };
    1 + timeouts + 3 + 1 + ic.pages.iter().map(page_size).sum::<usize>()
}

fn write_interactive_composition_body(buf: &mut SegmentBuilder, ic: &InteractiveComposition) {
    buf.emit(&[((ic.stream_model_multiplexed as u8) << 7) | ((ic.user_interface_model_popup as u8) << 6)]);
    if ic.stream_model_multiplexed {
        let composition_pts = ic.composition_time_out_pts.unwrap_or(0) & 0x1_FFFF_FFFF;
        let selection_pts = ic.selection_time_out_pts.unwrap_or(0) & 0x1_FFFF_FFFF;
        buf.emit(&[
            (composition_pts >> 32) as u8 & 0x01,
            (composition_pts >> 24) as u8,
            (composition_pts >> 16) as u8,
            (composition_pts >> 8) as u8,
            composition_pts as u8,
        ]);
        buf.emit(&[
            (selection_pts >> 32) as u8 & 0x01,
            (selection_pts >> 24) as u8,
            (selection_pts >> 16) as u8,
            (selection_pts >> 8) as u8,
            selection_pts as u8,
        ]);
    }
    buf.emit(&[
        (ic.user_time_out_duration >> 16) as u8,
        (ic.user_time_out_duration >> 8) as u8,
        ic.user_time_out_duration as u8,
        ic.pages.len() as u8,
    ]);
    for page in &ic.pages {
        write_page(buf, page);
    }
}

/// Serialize the whole ICS payload (a 24-bit `interactive_composition_length`
/// prefix followed by the body), then split into fragments each carrying
/// its own video/composition/sequence descriptor, per §6.
pub fn compute_size_ics_family(ic: &InteractiveComposition) -> usize {
    let body = interactive_composition_body_size(ic);
    let full_payload = 3 + body; // interactive_composition_length prefix
    let nb_seg = full_payload / HDMV_MAX_SIZE_ICS_FRAGMENT;
    let extra = full_payload % HDMV_MAX_SIZE_ICS_FRAGMENT;
    let mut size = nb_seg * (HDMV_SIZE_SEGMENT_HEADER + HDMV_SIZE_ICS_SEGMENT_HEADER + HDMV_MAX_SIZE_ICS_FRAGMENT);
    if extra > 0 {
        size += HDMV_SIZE_SEGMENT_HEADER + HDMV_SIZE_ICS_SEGMENT_HEADER + extra;
    }
    size
}

pub fn write_ics_segments(
    buf: &mut SegmentBuilder,
    video_descriptor: VideoDescriptor,
    composition_descriptor: CompositionDescriptor,
    ic: &InteractiveComposition,
) -> Result<()> {
    let body = interactive_composition_body_size(ic);
    let mut scratch = SegmentBuilder::new();
    scratch.reserve(3 + body)?;
    let len = body as u32;
    scratch.emit(&[(len >> 16) as u8, (len >> 8) as u8, len as u8]);
    write_interactive_composition_body(&mut scratch, ic);
    let full_payload = scratch.used();

    let total = compute_size_ics_family(ic);
    buf.reserve(total)?;

    let mut remaining = &scratch.data[..];
    let mut first = true;
    while !remaining.is_empty() {
        let frag_len = remaining.len().min(HDMV_MAX_SIZE_ICS_FRAGMENT);
        let (frag, rest) = remaining.split_at(frag_len);
        let last = rest.is_empty();

        write_segment_header(buf, HDMV_SEGMENT_TYPE_ICS, HDMV_SIZE_ICS_SEGMENT_HEADER + frag_len)?;
        write_video_descriptor(buf, video_descriptor);
        write_composition_descriptor(buf, composition_descriptor);
        write_sequence_descriptor(buf, first, last);
        buf.emit(frag);

        remaining = rest;
        first = false;
    }
    debug_assert_eq!(full_payload, 3 + body);
    Ok(())
}

/// Build a complete IGS Display Set: ICS fragments, PDS for every palette,
/// fragmented ODS for every object, then END (`build_IGS_display_set`).
#[allow(clippy::too_many_arguments)]
pub fn build_igs_display_set(
    buf: &mut SegmentBuilder,
    video_descriptor: VideoDescriptor,
    composition_descriptor: CompositionDescriptor,
    ic: &InteractiveComposition,
    palettes: &[(u8, &Palette)],
    objects: &[&HdmvObject],
) -> Result<()> {
    write_ics_segments(buf, video_descriptor, composition_descriptor, ic)?;
    write_pds_segments(buf, palettes)?;
    write_ods_segments(buf, objects)?;
    write_end_segment(buf)
}

/// Build a complete PGS Display Set: PCS, optional WDS, PDS for every
/// palette, ODS for every object, then END (`build_PGS_display_set`).
#[allow(clippy::too_many_arguments)]
pub fn build_pgs_display_set(
    buf: &mut SegmentBuilder,
    video_descriptor: VideoDescriptor,
    composition_descriptor: CompositionDescriptor,
    pc: &PresentationComposition,
    windows: &[WindowInfo],
    palettes: &[(u8, &Palette)],
    objects: &[&HdmvObject],
) -> Result<()> {
    write_pcs(buf, video_descriptor, composition_descriptor, pc)?;
    if !windows.is_empty() {
        write_wds(buf, windows)?;
    }
    write_pds_segments(buf, palettes)?;
    write_ods_segments(buf, objects)?;
    write_end_segment(buf)
}
