//! H.264 Annex C Hypothetical Reference Decoder conformance verifier.

pub mod cpb;
pub mod dpb;
pub mod levels;
pub mod verifier;

pub use dpb::{AdaptiveMarkingOp, DpbEntry, DpbMarkingState, PictureUsage};
pub use levels::Profile;
pub use verifier::{AuInput, HrdConfig, HrdVerifier};
