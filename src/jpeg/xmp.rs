//! XMP APP1 segment handling.
//!
//! Ultra HDR files describe their gain map in an XMP packet carried in an
//! APP1 segment. This module reads that packet out and, for the editing
//! path, rewrites a JPEG with the XMP segments removed so stale gain-map
//! metadata cannot survive an edit that invalidated it.

use crate::jpeg::markers::{scan_markers, APP1, SOS};
use crate::types::Result;

/// XMP APP1 identifier: the NUL-terminated Adobe namespace URI.
pub const XMP_IDENTIFIER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Produce a copy of `data` with XMP-bearing APP1 segments removed.
///
/// Only APP1 segments whose payload begins with the exact
/// [`XMP_IDENTIFIER`] bytes are dropped; EXIF segments and payloads that
/// merely resemble a truncated XMP signature are preserved. Segments are
/// wholly kept or wholly dropped, each copied verbatim with its original
/// length field, and everything from the Start-Of-Scan marker through the
/// end of the buffer (entropy-coded data plus trailing EOI) is carried over
/// untouched. The result is a structurally valid JPEG; running it through
/// this function again returns it byte-identical.
pub fn strip_xmp(data: &[u8]) -> Result<Vec<u8>> {
    let segments = scan_markers(data)?;
    let mut out = Vec::with_capacity(data.len());

    for segment in &segments {
        if segment.code == SOS {
            // Terminal span, never reparsed.
            out.extend_from_slice(&data[segment.start..]);
            return Ok(out);
        }
        if segment.is_xmp(data) {
            continue;
        }
        out.extend_from_slice(&data[segment.span()]);
    }

    // Truncated input with no SOS: the retained spans are all there is.
    Ok(out)
}

/// Return the packet bytes of the first XMP APP1 segment, if any.
///
/// The returned slice is the payload after the identifier, borrowed from
/// `data`; this crate does not interpret it.
pub fn xmp_payload(data: &[u8]) -> Result<Option<&[u8]>> {
    let segments = scan_markers(data)?;
    for segment in &segments {
        if segment.code == APP1 {
            let payload = segment.payload(data);
            if payload.starts_with(XMP_IDENTIFIER) {
                return Ok(Some(&payload[XMP_IDENTIFIER.len()..]));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Error;

    fn jpeg_with_app1(payload: &[u8]) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0xFF, 0xE1]);
        data.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        data.extend_from_slice(payload);
        data.extend_from_slice(&[0xFF, 0xDA, 0x01, 0x02, 0x03, 0xFF, 0xD9]);
        data
    }

    #[test]
    fn test_strip_removes_xmp_segment() {
        let mut payload = XMP_IDENTIFIER.to_vec();
        payload.extend_from_slice(b"<x:xmpmeta/>");
        let data = jpeg_with_app1(&payload);

        let stripped = strip_xmp(&data).unwrap();
        let expected = [
            &data[..2],
            &[0xFF, 0xDA, 0x01, 0x02, 0x03, 0xFF, 0xD9][..],
        ]
        .concat();
        assert_eq!(stripped, expected);
    }

    #[test]
    fn test_strip_preserves_exif_segment() {
        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(&[0x4D, 0x4D, 0x00, 0x2A]);
        let data = jpeg_with_app1(&payload);

        assert_eq!(strip_xmp(&data).unwrap(), data);
    }

    #[test]
    fn test_strip_preserves_truncated_xmp_prefix() {
        // The first 20 bytes of the XMP signature, then something else; an
        // exact match is required for removal.
        let payload = b"http://ns.adobe.com/noise".to_vec();
        let data = jpeg_with_app1(&payload);

        assert_eq!(strip_xmp(&data).unwrap(), data);
    }

    #[test]
    fn test_strip_rejects_non_jpeg() {
        assert!(matches!(strip_xmp(b"not a jpeg"), Err(Error::NotAJpeg)));
    }

    #[test]
    fn test_xmp_payload_roundtrip() {
        let mut payload = XMP_IDENTIFIER.to_vec();
        payload.extend_from_slice(b"<x:xmpmeta/>");
        let data = jpeg_with_app1(&payload);

        assert_eq!(xmp_payload(&data).unwrap(), Some(&b"<x:xmpmeta/>"[..]));
        assert_eq!(xmp_payload(&strip_xmp(&data).unwrap()).unwrap(), None);
    }
}
