//! HDMV graphics pipeline: wire-format constants, the segment builder, and
//! the PGS/IGS epoch generator, grounded on `hdmv_builder.c`/`pgs_generator.c`.

pub mod constants;
pub mod pgs_generator;
pub mod segment;

pub use segment::{
    build_igs_display_set, build_pgs_display_set, ActivatedStateInfo, Button, ButtonOverlapGroup,
    CompositionDescriptor, CompositionObject, Effect, EffectSequence, InteractiveComposition,
    NavigationCommand, NeighborInfo, NormalStateInfo, Page, PresentationComposition,
    SegmentBuilder, SelectedStateInfo, VideoDescriptor, WindowInfo,
};
