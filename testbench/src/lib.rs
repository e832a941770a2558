//! Shared helpers for libblu-core's end-to-end scenario tests and benches.

use libblu_core::esms::writer::ESMS_FORMAT_VERSION;
use libblu_core::{Bitmap, Palette, YCbCrMatrix};

/// A horizontal RGBA gradient, opaque, `width` columns wide and `height`
/// rows tall — enough colour variety to exercise the quantiser without
/// needing a real decoded image source.
pub fn gradient_bitmap(width: u32, height: u32) -> anyhow::Result<Bitmap> {
    let mut bmp = Bitmap::new(width, height)?;
    for y in 0..height {
        for x in 0..width {
            let t = if width > 1 { (x * 255 / (width - 1)) as u8 } else { 0 };
            let rgba = (u32::from(t) << 24) | (u32::from(255 - t) << 16) | (0x40 << 8) | 0xFF;
            bmp.set(x, y, rgba);
        }
    }
    Ok(bmp)
}

/// A fresh BT.601 palette with `n` distinct greys loaded in, for tests that
/// just need *some* populated palette.
pub fn grey_palette(n: u8) -> anyhow::Result<Palette> {
    let mut p = Palette::new(0, 0, YCbCrMatrix::Bt601, false);
    for i in 0..n {
        let v = u32::from(i) * 0x01010100 | 0xFF;
        p.add_rgba(v)?;
    }
    Ok(p)
}

/// Confirms the crate's ESMS writer satisfies a semver requirement a
/// downstream muxer might declare before consuming the file it writes —
/// the same gating shape the teacher's testbench uses to check an external
/// tool's version before depending on a feature it provides.
pub fn esms_format_version_satisfies(requirement: &str) -> anyhow::Result<bool> {
    let version = semver::Version::parse(&format!("{ESMS_FORMAT_VERSION}.0.0"))?;
    let req = semver::VersionReq::parse(requirement)?;
    Ok(req.matches(&version))
}

/// A human-readable generation timestamp for stamping into example output,
/// formatted the same way the teacher's SEI timestamp example renders a
/// `chrono::DateTime<Utc>`.
pub fn format_generation_timestamp(dt: chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[test]
fn esms_version_one_satisfies_a_one_x_requirement() {
    assert!(esms_format_version_satisfies(">=1.0.0, <2.0.0").unwrap());
    assert!(!esms_format_version_satisfies(">=2.0.0").unwrap());
}

#[test]
fn generation_timestamp_formats_as_iso8601() {
    use chrono::TimeZone;
    let dt = chrono::Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 0).unwrap();
    assert_eq!(format_generation_timestamp(dt), "2024-03-05T12:30:00.000Z");
}
