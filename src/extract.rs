//! Sub-image extraction: resolving MPF descriptors into validated byte
//! ranges and decomposing a container into its base and gain-map JPEGs.
//!
//! All functions here return sub-slices of the caller's buffer; nothing is
//! copied and nothing outlives the call.

use core::ops::Range;

use crate::container::{self, MpfEntry};
use crate::jpeg::markers::{find_sos, scan_markers, MarkerSegment, EOI, SOI};
use crate::types::{Error, Result};

/// A decomposed MPF container.
#[derive(Debug, Clone, Copy)]
pub struct SplitImage<'a> {
    /// The primary (SDR base) JPEG.
    pub base: &'a [u8],
    /// The gain-map JPEG, when the container carries one.
    pub gainmap: Option<&'a [u8]>,
}

/// True when `data` holds a Start-Of-Image marker at `at`.
fn soi_at(data: &[u8], at: usize) -> bool {
    data.len() >= at + 2 && data[at] == 0xFF && data[at + 1] == SOI
}

/// Position immediately after the first End-Of-Image marker at or past
/// `from`, read as an unaligned big-endian pair.
fn after_next_eoi(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(2)
        .position(|pair| pair[0] == 0xFF && pair[1] == EOI)
        .map(|found| from + found + 2)
}

/// Offset of the first Start-Of-Image marker at or past `from`.
fn next_soi(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(2)
        .position(|pair| pair[0] == 0xFF && pair[1] == SOI)
        .map(|found| from + found)
}

/// Resolve a descriptor's start position within the buffer.
///
/// An offset of 0 names the image contiguous with the end of the primary
/// image: the first EOI past the primary's entropy data is located by a
/// plain byte search from the Start-Of-Scan payload (the scan data is never
/// interpreted, only searched). A nonzero offset is absolute from the start
/// of the buffer; known producers emit offsets that miss the SOI by a few
/// bytes, so when no SOI sits at the stated position the resolution rescans
/// forward for the next one instead of failing.
fn resolve_start(data: &[u8], segments: &[MarkerSegment], entry: &MpfEntry) -> Result<usize> {
    if entry.offset == 0 {
        let sos = find_sos(segments).ok_or_else(|| {
            Error::Truncated("no SOS marker before end of primary image".into())
        })?;
        after_next_eoi(data, sos.payload_start).ok_or_else(|| {
            Error::InvalidSubImageOffset("no EOI terminating the primary scan data".into())
        })
    } else {
        let stated = entry.offset as usize;
        if soi_at(data, stated) {
            Ok(stated)
        } else {
            next_soi(data, stated).ok_or_else(|| {
                Error::InvalidSubImageOffset(format!(
                    "no SOI at or after stated offset {stated}"
                ))
            })
        }
    }
}

/// Resolve a descriptor into a validated byte range.
///
/// The range must lie within the buffer and begin with SOI; otherwise the
/// resolution fails with [`Error::InvalidSubImageOffset`] for this
/// sub-image only.
pub fn resolve_entry(
    data: &[u8],
    segments: &[MarkerSegment],
    entry: &MpfEntry,
) -> Result<Range<usize>> {
    let start = resolve_start(data, segments, entry)?;
    let end = start
        .checked_add(entry.size as usize)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            Error::InvalidSubImageOffset(format!(
                "sub-image at {start} with size {} leaves the buffer",
                entry.size
            ))
        })?;
    if !soi_at(data, start) {
        return Err(Error::InvalidSubImageOffset(format!(
            "no SOI marker at resolved offset {start}"
        )));
    }
    Ok(start..end)
}

/// The sub-image list of the buffer's MPF container, when one exists.
fn sub_images(data: &[u8], segments: &[MarkerSegment]) -> Result<Option<Vec<MpfEntry>>> {
    let Some(segment) = container::find_mpf_segment(data, segments) else {
        return Ok(None);
    };
    let directory = container::parse_mpf_directory(data, segment)?;
    Ok(Some(directory.entries))
}

/// Decompose a JPEG buffer into its base image and optional gain map.
///
/// A buffer with no MPF container, a directory that cannot be interpreted,
/// or a directory listing a single image is returned whole as the base
/// image with no gain map. A listed gain map that fails range validation is
/// an error ([`Error::InvalidSubImageOffset`]); callers that prefer to
/// degrade use [`base_image`] and [`gainmap_image`] independently.
pub fn split_image(data: &[u8]) -> Result<SplitImage<'_>> {
    let segments = scan_markers(data)?;
    let entries = match sub_images(data, &segments) {
        Ok(Some(entries)) if entries.len() >= 2 => entries,
        // Plain single JPEG, or a container we cannot interpret.
        Ok(_) | Err(Error::MalformedMpf(_)) => {
            return Ok(SplitImage {
                base: data,
                gainmap: None,
            })
        }
        Err(err) => return Err(err),
    };

    let gainmap = resolve_entry(data, &segments, &entries[1])?;
    // The primary's offset is 0 in any conforming container, making the
    // base image the leading portion of the buffer up to where the gain
    // map starts; a nonzero offset is resolved like any other sub-image.
    let base = if entries[0].offset == 0 {
        &data[..gainmap.start]
    } else {
        let range = resolve_entry(data, &segments, &entries[0])?;
        &data[range]
    };
    Ok(SplitImage {
        base,
        gainmap: Some(&data[gainmap]),
    })
}

/// Extract the base image from a JPEG buffer.
///
/// When a gain map is present and resolvable, the base image is the leading
/// portion of the buffer ending where the gain map begins. In every other
/// case (no MPF container, a malformed directory, a gain map that fails
/// validation) the whole buffer is the base image; a plain JPEG viewer
/// ignores any trailing bytes.
pub fn base_image(data: &[u8]) -> Result<&[u8]> {
    match split_image(data) {
        Ok(split) => Ok(split.base),
        Err(Error::NotAJpeg) => Err(Error::NotAJpeg),
        Err(_) => Ok(data),
    }
}

/// Extract the gain-map image from a JPEG buffer.
///
/// `Ok(None)` when the buffer has no MPF container or the directory lists
/// no second image; an error only when a listed gain map cannot be
/// resolved and validated.
pub fn gainmap_image(data: &[u8]) -> Result<Option<&[u8]>> {
    let segments = scan_markers(data)?;
    match sub_images(data, &segments)? {
        Some(entries) => match entries.get(1) {
            Some(entry) => {
                let range = resolve_entry(data, &segments, entry)?;
                Ok(Some(&data[range]))
            }
            None => Ok(None),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SOI, SOS, three scan bytes, EOI.
    fn tiny_jpeg() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xDA, 0x01, 0x02, 0x03, 0xFF, 0xD9]
    }

    #[test]
    fn test_plain_jpeg_splits_to_base_only() {
        let data = tiny_jpeg();
        let split = split_image(&data).unwrap();

        assert_eq!(split.base, &data[..]);
        assert!(split.gainmap.is_none());
    }

    #[test]
    fn test_resolve_contiguous_entry_searches_past_scan_data() {
        // Primary then a second JPEG butted against its EOI; descriptor
        // offset 0 resolves by EOI search, not arithmetic.
        let mut data = tiny_jpeg();
        let boundary = data.len();
        let second = tiny_jpeg();
        data.extend_from_slice(&second);

        let segments = scan_markers(&data).unwrap();
        let entry = MpfEntry {
            attribute: 0,
            size: second.len() as u32,
            offset: 0,
        };
        assert_eq!(
            resolve_entry(&data, &segments, &entry).unwrap(),
            boundary..data.len()
        );
    }

    #[test]
    fn test_resolve_rejects_offset_with_no_soi_anywhere() {
        let data = tiny_jpeg();
        let segments = scan_markers(&data).unwrap();
        let entry = MpfEntry {
            attribute: 0,
            size: 4,
            offset: 2,
        };
        // No SOI at offset 2 and none anywhere after it either.
        assert!(matches!(
            resolve_entry(&data, &segments, &entry),
            Err(Error::InvalidSubImageOffset(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_size_leaving_buffer() {
        let mut data = tiny_jpeg();
        let second_start = data.len() as u32;
        data.extend_from_slice(&tiny_jpeg());

        let segments = scan_markers(&data).unwrap();
        let entry = MpfEntry {
            attribute: 0,
            size: 10_000,
            offset: second_start,
        };
        assert!(matches!(
            resolve_entry(&data, &segments, &entry),
            Err(Error::InvalidSubImageOffset(_))
        ));
    }

    #[test]
    fn test_resolve_truncated_stream_without_sos() {
        // SOI + APP0 only; the scan never reaches an SOS, so an offset-0
        // descriptor has nothing to anchor to.
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
        let segments = scan_markers(&data).unwrap();
        let entry = MpfEntry {
            attribute: 0,
            size: 4,
            offset: 0,
        };
        assert!(matches!(
            resolve_entry(&data, &segments, &entry),
            Err(Error::Truncated(_))
        ));
    }
}
