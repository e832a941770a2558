//! Builds a single-object PGS subtitle display set from a gradient bitmap
//! and prints its segment layout.

use libblu_core::hdmv::constants::HDMV_SIZE_SEGMENT_HEADER;
use libblu_core::hdmv::{
    build_pgs_display_set, CompositionDescriptor, CompositionObject, PresentationComposition,
    SegmentBuilder, VideoDescriptor, WindowInfo,
};
use libblu_core::object_codec::{self, HdmvObject, ObjectDescriptor};
use libblu_core::{apply_palette, Rect};

use testbench::{gradient_bitmap, grey_palette};

fn main() -> anyhow::Result<()> {
    let bitmap = gradient_bitmap(320, 90)?;
    let palette = grey_palette(16)?;
    let palletised = apply_palette(&bitmap, &palette, true);
    let rle = object_codec::encode(&palletised);

    let object = HdmvObject {
        palletised_bitmap: palletised,
        rle,
        descriptor: ObjectDescriptor { object_id: 0, version: 0 },
    };

    let window = WindowInfo { window_id: 0, rect: Rect::new(800, 950, 320, 90) };
    let pc = PresentationComposition {
        palette_update_flag: false,
        palette_id_ref: 0,
        composition_objects: vec![CompositionObject {
            object_id_ref: 0,
            window_id_ref: 0,
            h_pos: 800,
            v_pos: 950,
            cropping: None,
        }],
    };

    let mut buf = SegmentBuilder::new();
    build_pgs_display_set(
        &mut buf,
        VideoDescriptor { video_width: 1920, video_height: 1080, frame_rate_id: 0x04 },
        CompositionDescriptor { composition_number: 0, composition_state: 2 },
        &pc,
        &[window],
        &[(0, &palette)],
        &[&object],
    )?;

    let mut bytes = Vec::new();
    buf.flush(|chunk| {
        bytes.extend_from_slice(chunk);
        Ok(())
    })?;

    println!("PGS display set: {} bytes total", bytes.len());
    let mut pos = 0usize;
    while pos < bytes.len() {
        let seg_type = bytes[pos];
        let len = ((bytes[pos + 1] as usize) << 8) | bytes[pos + 2] as usize;
        println!("  segment 0x{:02X}, payload {} bytes", seg_type, len);
        pos += HDMV_SIZE_SEGMENT_HEADER + len;
    }
    Ok(())
}
