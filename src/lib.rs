// Copyright 2022-2023 Andrew D. Straw.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! H.264 Annex C HRD conformance verification and HDMV/Blu-ray graphics
//! authoring library.
//!
//! This crate implements two related pieces of a subtitle/graphics authoring
//! pipeline for Blu-ray disc mastering:
//!
//! - [`hrd`]: a Hypothetical Reference Decoder timing and buffer model
//!   (Annex C, with the Annex A level tables) that replays an access unit
//!   stream through the CPB and DPB and reports conformance violations via a
//!   [`diagnostics::DiagnosticSink`] rather than panicking or logging
//!   directly.
//! - [`hdmv`], [`palette`], [`quantizer`], [`bitmap`], [`object_codec`] and
//!   [`tree`]: the encode side of the HDMV presentation graphics (PGS) and
//!   interactive graphics (IGS) segment formats used to burn subtitle/menu
//!   overlays into a Blu-ray-compliant elementary stream, plus the
//!   [`esms`] intermediate script writer that hands the result to a
//!   downstream muxer.
//!
//! All public error paths return [`error::Error`] via [`error::Result`].
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(feature = "backtrace", feature(error_generic_member_access))]
#![deny(unsafe_code)]

#[cfg(not(feature = "std"))]
extern crate core as std;

extern crate alloc;

#[cfg(feature = "backtrace")]
#[allow(unused_imports)]
use std::backtrace::Backtrace;

pub mod error;
pub use error::{Error, Result};

pub mod diagnostics;
pub use diagnostics::{DiagnosticEvent, DiagnosticLevel, DiagnosticSink, NullSink, VecSink};

pub mod rect;
pub use rect::Rect;

pub mod palette;
pub use palette::{Palette, PaletteEntry, YCbCrMatrix, MAX_PALETTE_ENTRIES};

pub mod quantizer;
pub use quantizer::{quantize, Hexatree};

pub mod bitmap;
pub use bitmap::{apply_palette, Bitmap, PalletisedBitmap};

pub mod object_codec;
pub use object_codec::{build_object_data, decode, encode, HdmvObject, ObjectDescriptor};

pub mod tree;
pub use tree::{CollisionTree, MergingTree};

pub mod hdmv;
pub mod hrd;
pub mod esms;
