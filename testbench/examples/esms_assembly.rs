//! Assembles a minimal ESMS intermediate script file, writes it to a temp
//! file, then re-reads it to verify the directory table and CRC trailer.

use std::io::{Read, Write};

use libblu_core::esms::writer::build_es_properties_directory;
use libblu_core::esms::{build_esms_file, crc32_ieee, DirectoryId};

fn main() -> anyhow::Result<()> {
    let dir = build_es_properties_directory("video.h264");
    let file_bytes = build_esms_file(&[(DirectoryId::EsProperties, dir)]);

    let mut tmp = tempfile::NamedTempFile::new()?;
    tmp.write_all(&file_bytes)?;
    tmp.flush()?;

    let mut reread = Vec::new();
    std::fs::File::open(tmp.path())?.read_to_end(&mut reread)?;
    assert_eq!(reread, file_bytes);

    // The trailer is `[u16 crc_checked_bytes][u32 crc32]`, 6 bytes total,
    // covering exactly the directory payload bytes written ahead of it.
    let len = reread.len();
    let checked_bytes = u16::from_be_bytes([reread[len - 6], reread[len - 5]]) as usize;
    let crc = u32::from_be_bytes(reread[len - 4..].try_into().unwrap());
    let payload_start = len - 6 - checked_bytes;
    let recomputed = crc32_ieee(&reread[payload_start..len - 6]);

    println!("wrote {} bytes to {}", file_bytes.len(), tmp.path().display());
    println!("directory CRC trailer verifies: {}", recomputed == crc);
    println!("generated at {}", testbench::format_generation_timestamp(chrono::Utc::now()));
    Ok(())
}
