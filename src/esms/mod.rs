//! ESMS intermediate script file writer (downstream muxer contract).

pub mod writer;

pub use writer::{build_esms_file, crc32_ieee, DirectoryId, EsmsWriter};
