/// Errors returned by the HRD verifier and HDMV graphics pipeline.
///
/// Every core operation returns one of these rather than swallowing the
/// failure locally. Variants that carry an `annex_rule` or `rule_id` field
/// name the exact Annex/clause that was violated so a caller can report it
/// verbatim, matching the source's convention of logging the clause number
/// alongside the numeric operands that failed.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A `Bitmap`/`PalletisedBitmap` width or height fell outside `[8,4096]`.
    InvalidDimensions { width: u32, height: u32 },
    /// `Palette::add_rgba` was called on a palette with all 255 slots full.
    TooManyPaletteEntries,
    /// A palette update did not satisfy `new.id == old.id` and
    /// `new.version == (old.version + 1) % 256`.
    BadPaletteUpdate { expected_version: u8, got_version: u8 },
    /// RLE decode found a malformed stream: wrong line width or missing
    /// trailing `00 00`.
    BrokenRLE { msg: &'static str },
    /// The segment-builder scratch buffer could not grow far enough.
    SizeOverflow,
    /// CPB occupancy exceeded `cpb_size` (Annex C.3.2).
    CpbOverflow { occupancy_bits: u64, cpb_size_bits: u64 },
    /// `T_r(n) < T_f(n)`: the AU could not have been fully received in time
    /// (Annex C.3.3).
    CpbUnderflow { removal_time: u64, final_arrival_time: u64 },
    /// `num_short_term + num_long_term > max(max_num_ref_frames, 1)` after a
    /// marking operation.
    DpbReferenceOverflow { count: u32, limit: u32 },
    /// `nb_pic_in_dpb > dpb_size` (Annex C.3.5).
    DpbSizeOverflow { count: u32, dpb_size: u32 },
    /// A named Annex A/C timing rule was violated; `operands` carries the
    /// one-to-two numeric values involved, matching the source's varargs
    /// log calls.
    HrdTimingViolation {
        annex_rule: &'static str,
        operands: [Option<i64>; 2],
    },
    /// A PGS frame's `DECODE_DURATION` or a sequence's `min_drawing_duration`
    /// exceeded the interval available before the next frame.
    SequenceTooDense { available_ticks: i64, required_ticks: i64 },
    /// An Epoch's Decoded-Object-Buffer usage exceeded `HDMV_PG_DB_SIZE`.
    DOBOverflow { usage_bytes: u64, limit_bytes: u64 },
    /// Allocation failure (kept distinct from `Io` to mirror the source's
    /// separate `malloc`-failure error paths).
    MemoryAllocation,
    /// An I/O failure while writing segments or the ESMS script.
    #[cfg(feature = "std")]
    Io { source: std::io::Error },
    /// A catch-all for malformed caller input that does not fit a more
    /// specific variant, carrying a short message (mirrors the source's
    /// `LIBBLU_HDMV_SEGBUILD_ERROR_RETURN` one-off messages).
    DataShapeProblem { msg: &'static str },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidDimensions { width, height } => write!(
                f,
                "invalid bitmap dimensions {}x{} (must be within [8,4096])",
                width, height
            ),
            Error::TooManyPaletteEntries => {
                write!(f, "palette already has 255 entries in use")
            }
            Error::BadPaletteUpdate { expected_version, got_version } => write!(
                f,
                "bad palette update: expected version {}, got {}",
                expected_version, got_version
            ),
            Error::BrokenRLE { msg } => write!(f, "broken RLE stream: {}", msg),
            Error::SizeOverflow => write!(f, "segment buffer size overflow"),
            Error::CpbOverflow { occupancy_bits, cpb_size_bits } => write!(
                f,
                "CPB overflow: occupancy {} bits exceeds cpb_size {} bits",
                occupancy_bits, cpb_size_bits
            ),
            Error::CpbUnderflow { removal_time, final_arrival_time } => write!(
                f,
                "CPB underflow: removal_time {} < final_arrival_time {}",
                removal_time, final_arrival_time
            ),
            Error::DpbReferenceOverflow { count, limit } => write!(
                f,
                "DPB reference overflow: {} references exceeds limit {}",
                count, limit
            ),
            Error::DpbSizeOverflow { count, dpb_size } => write!(
                f,
                "DPB size overflow: {} pictures exceeds dpb_size {}",
                count, dpb_size
            ),
            Error::HrdTimingViolation { annex_rule, operands } => {
                write!(f, "HRD timing violation ({}):", annex_rule)?;
                for op in operands.iter().flatten() {
                    write!(f, " {}", op)?;
                }
                Ok(())
            }
            Error::SequenceTooDense { available_ticks, required_ticks } => write!(
                f,
                "sequence too dense: needs {} ticks but only {} available",
                required_ticks, available_ticks
            ),
            Error::DOBOverflow { usage_bytes, limit_bytes } => write!(
                f,
                "Decoded-Object-Buffer overflow: {} bytes exceeds limit {}",
                usage_bytes, limit_bytes
            ),
            Error::MemoryAllocation => write!(f, "memory allocation error"),
            #[cfg(feature = "std")]
            Error::Io { source } => write!(f, "I/O error: {}", source),
            Error::DataShapeProblem { msg } => write!(f, "{}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
