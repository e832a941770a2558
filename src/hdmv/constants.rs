//! HDMV wire-format geometry constants, grounded on `hdmv_data.h`.

/// Every PG/IG segment's payload must fit in a `u16` length field.
pub const HDMV_MAX_SIZE_SEGMENT_PAYLOAD: usize = 0xFFFF;
/// `[u8 type][u16 length]`.
pub const HDMV_SIZE_SEGMENT_HEADER: usize = 3;
/// Segment header + max payload.
pub const HDMV_MAX_SIZE_SEGMENT: usize = HDMV_SIZE_SEGMENT_HEADER + HDMV_MAX_SIZE_SEGMENT_PAYLOAD;

pub const HDMV_SIZE_VIDEO_DESCRIPTOR: usize = 5;
pub const HDMV_SIZE_COMPOSITION_DESCRIPTOR: usize = 3;
pub const HDMV_SIZE_SEQUENCE_DESCRIPTOR: usize = 1;
pub const HDMV_SIZE_PALETTE_DESCRIPTOR: usize = 2;
pub const HDMV_SIZE_PALETTE_DEFINITION_ENTRY: usize = 5;
pub const HDMV_SIZE_OBJECT_DESCRIPTOR: usize = 3;
/// `object_descriptor` + `sequence_descriptor`, the per-ODS-fragment extra
/// header beyond the common segment header.
pub const HDMV_SIZE_OD_SEGMENT_HEADER: usize = HDMV_SIZE_OBJECT_DESCRIPTOR + HDMV_SIZE_SEQUENCE_DESCRIPTOR;
pub const HDMV_MAX_SIZE_OBJECT_DEFINITION_FRAGMENT: usize =
    HDMV_MAX_SIZE_SEGMENT_PAYLOAD - HDMV_SIZE_OD_SEGMENT_HEADER;

/// Every ICS fragment carries its own video/composition/sequence descriptor
/// ahead of the fragment bytes.
pub const HDMV_SIZE_ICS_SEGMENT_HEADER: usize =
    HDMV_SIZE_VIDEO_DESCRIPTOR + HDMV_SIZE_COMPOSITION_DESCRIPTOR + HDMV_SIZE_SEQUENCE_DESCRIPTOR;
pub const HDMV_MAX_SIZE_ICS_FRAGMENT: usize =
    HDMV_MAX_SIZE_SEGMENT_PAYLOAD - HDMV_SIZE_ICS_SEGMENT_HEADER;

/// `[u24 effect_duration][u16 palette_id][u8 number_of_composition_objects]`.
pub const HDMV_SIZE_EFFECT_HEADER: usize = 6;
/// `upper_button_id_ref/lower/left/right`, each `u16`.
pub const HDMV_SIZE_BUTTON_NEIGHBOR_INFO: usize = 8;
pub const HDMV_SIZE_BUTTON_NORMAL_STATE_INFO: usize = 5;
pub const HDMV_SIZE_BUTTON_SELECTED_STATE_INFO: usize = 6;
pub const HDMV_SIZE_BUTTON_ACTIVATED_STATE_INFO: usize = 4;
/// `[u32 opcode][u32 destination][u32 source]`.
pub const HDMV_SIZE_NAVIGATION_COMMAND: usize = 12;

pub const HDMV_SIZE_PRESENTATION_COMPOSITION_HEADER: usize = 3;
pub const HDMV_SIZE_COMPOSITION_OBJECT_BASE: usize = 8;
pub const HDMV_SIZE_COMPOSITION_OBJECT_CROPPED_EXTRA: usize = 8;

pub const HDMV_SIZE_WINDOW_INFO: usize = 9;

pub const HDMV_MAX_NB_WDS_WINDOWS: usize = 255;
pub const HDMV_MAX_NB_PCS_COMPOS: usize = 255;
pub const HDMV_MAX_NB_PDS_ENTRIES: usize = 255;
pub const HDMV_MAX_NB_ICS_COMPOS: usize = 1;
pub const HDMV_MAX_NB_ICS_WINDOWS: usize = 255;
pub const HDMV_MAX_NB_ICS_EFFECTS: usize = 255;
pub const HDMV_MAX_NB_ICS_COMP_OBJ: usize = 255;
pub const HDMV_MAX_NB_ICS_BOGS: usize = 255;
pub const HDMV_MAX_NB_ICS_BUTTONS: usize = 255;
pub const HDMV_MAX_NB_ICS_PAGES: usize = 255;
pub const HDMV_MAX_OBJ_DATA_LEN: u32 = 0xFF_FFFF;

/// PG epoch Decoded-Object-Buffer size (bytes).
pub const HDMV_PG_DB_SIZE: u64 = 1024 * 1024;
/// Maximum distinct PG object ids alive in one Epoch.
pub const HDMV_OD_PG_MAX_NB_OBJ: usize = 64;

/// Segment type codes (§4.7/§6).
pub const HDMV_SEGMENT_TYPE_PDS: u8 = 0x14;
pub const HDMV_SEGMENT_TYPE_ODS: u8 = 0x15;
pub const HDMV_SEGMENT_TYPE_PCS: u8 = 0x16;
pub const HDMV_SEGMENT_TYPE_WDS: u8 = 0x17;
pub const HDMV_SEGMENT_TYPE_ICS: u8 = 0x18;
pub const HDMV_SEGMENT_TYPE_END: u8 = 0x80;

/// `frame_rate_id` field values (video_descriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameRateCode {
    Fps23976 = 0x01,
    Fps24 = 0x02,
    Fps25 = 0x03,
    Fps2997 = 0x04,
    Fps50 = 0x06,
    Fps5994 = 0x07,
}

/// composition_state values (composition_descriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompositionState {
    Normal = 0,
    AcquisitionPoint = 1,
    EpochStart = 2,
    EpochContinue = 3,
}
