//! Common test utilities for synthetic JPEG construction.
//!
//! Fixtures are built programmatically, avoiding binary test files in the
//! repository. Scan data bytes are chosen to never contain an 0xFF, so a
//! fixture's only marker-shaped byte pairs are its real markers.

#![allow(dead_code)]

use uhdr_container::jpeg::xmp::XMP_IDENTIFIER;

/// Build a marker segment with a length field: `FF <marker> <len> <body>`.
pub fn app_segment(marker: u8, body: &[u8]) -> Vec<u8> {
    let mut segment = vec![0xFF, marker];
    segment.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
    segment.extend_from_slice(body);
    segment
}

/// Build a JPEG: SOI, the given segments, SOS, scan data, EOI.
pub fn jpeg_with(segments: &[Vec<u8>], scan: &[u8]) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    for segment in segments {
        data.extend_from_slice(segment);
    }
    data.extend_from_slice(&[0xFF, 0xDA]);
    data.extend_from_slice(scan);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

/// A JFIF APP0 segment.
pub fn jfif_segment() -> Vec<u8> {
    app_segment(0xE0, b"JFIF\0\x01\x01\x00\x00\x01\x00\x01\x00\x00")
}

/// An EXIF APP1 segment with a token body.
pub fn exif_segment() -> Vec<u8> {
    app_segment(0xE1, b"Exif\0\0\x4D\x4D\x00\x2A")
}

/// An XMP APP1 segment wrapping the given packet.
pub fn xmp_segment(packet: &[u8]) -> Vec<u8> {
    let mut body = XMP_IDENTIFIER.to_vec();
    body.extend_from_slice(packet);
    app_segment(0xE1, &body)
}

/// A small base JPEG with JFIF and EXIF metadata.
pub fn base_jpeg() -> Vec<u8> {
    jpeg_with(
        &[jfif_segment(), exif_segment()],
        &[0x10, 0x20, 0x30, 0x40, 0x50, 0x60],
    )
}

/// A smaller gain-map JPEG.
pub fn gainmap_jpeg() -> Vec<u8> {
    jpeg_with(&[jfif_segment()], &[0x0A, 0x0B, 0x0C])
}
