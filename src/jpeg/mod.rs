//! JPEG marker-level plumbing: scanning and metadata-segment rewriting.

pub mod markers;
pub mod xmp;

pub use markers::{scan_markers, MarkerSegment};
pub use xmp::{strip_xmp, xmp_payload};
