//! JPEG/MPF container plumbing for Ultra HDR gain map images.
//!
//! Ultra HDR stores HDR content in a backwards-compatible JPEG: legacy
//! viewers see the SDR base image, while HDR-capable displays recover the
//! full range by applying an embedded gain map. The gain map is a second,
//! complete JPEG appended after the base image and described by a
//! Multi-Picture Format (MPF) directory in an APP2 segment.
//!
//! This crate is the container layer only: it scans JPEG markers, locates
//! and parses the MPF directory, carves the base and gain-map JPEGs out of
//! a buffer, rewrites metadata segments, and assembles containers back
//! together. It never decodes pixel data and never touches entropy-coded
//! bytes except to copy them verbatim; pixel work belongs to whatever
//! codec sits next to it.
//!
//! Every operation is a pure synchronous function over a caller-owned
//! `&[u8]`; extraction returns sub-slices of that buffer without copying.
//!
//! # Example
//!
//! ```
//! use uhdr_container::{container, split_image};
//!
//! let base = vec![0xFF, 0xD8, 0xFF, 0xDA, 0x01, 0x02, 0x03, 0xFF, 0xD9];
//! let gainmap = vec![0xFF, 0xD8, 0xFF, 0xDA, 0x09, 0x08, 0xFF, 0xD9];
//! let bundled = container::assemble(&base, &gainmap)?;
//!
//! let split = split_image(&bundled)?;
//! assert_eq!(split.gainmap, Some(&gainmap[..]));
//! # Ok::<(), uhdr_container::Error>(())
//! ```
//!
//! # Standards
//!
//! - [Ultra HDR Image Format v1.1](https://developer.android.com/media/platform/hdr-image-format)
//! - CIPA DC-007 (Multi-Picture Format)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod container;
pub mod extract;
pub mod jpeg;
mod types;

pub use extract::{base_image, gainmap_image, split_image, SplitImage};
pub use jpeg::{scan_markers, strip_xmp, xmp_payload, MarkerSegment};
pub use types::{Error, Result};

/// Safety limits for parsing untrusted containers.
pub mod limits {
    /// Maximum number of IFD entries walked in an MPF directory.
    pub const MAX_IFD_ENTRIES: usize = 256;

    /// Maximum number of sub-images accepted from an MP Image List.
    pub const MAX_SUB_IMAGES: usize = 64;
}
