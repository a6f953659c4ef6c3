//! Multi-Picture Format (MPF) container handling.
//!
//! MPF (CIPA DC-007) stores several complete JPEG images in one file by
//! appending the secondary images after the primary and describing them in
//! a TIFF-style directory carried in an APP2 segment. Ultra HDR uses it to
//! bundle a gain-map JPEG behind the SDR base image.
//!
//! This module locates the MPF segment among scanned markers, parses its
//! directory into sub-image descriptors, and builds the directory for the
//! assembly path. Resolving descriptors into validated byte ranges lives in
//! [`crate::extract`].

use crate::jpeg::markers::{scan_markers, MarkerSegment, APP0, APP1, SOI};
use crate::limits;
use crate::types::{Error, Result};

/// MPF APP2 identifier.
pub const MPF_IDENTIFIER: &[u8] = b"MPF\0";
/// MPF version string, stored in the directory's version tag.
pub const MPF_VERSION: &[u8] = b"0100";

/// Total size in bytes of the APP2 segment written by [`write_mpf_header`]
/// for a two-image (primary + gain map) container.
pub const MPF_SEGMENT_SIZE: usize = 90;

// MPF tag IDs
const TAG_VERSION: u16 = 0xB000;
const TAG_NUMBER_OF_IMAGES: u16 = 0xB001;
const TAG_MP_ENTRY: u16 = 0xB002;

// IFD field type constants
const TYPE_UNDEFINED: u16 = 7;
const TYPE_LONG: u16 = 4;

/// Size of one MP Entry record in the image list.
const MP_ENTRY_SIZE: usize = 16;

/// A sub-image descriptor from the MP Image List.
///
/// `offset` is 0 for an image contiguous with the end of the primary image,
/// and an absolute offset from the start of the whole buffer otherwise.
/// Index 0 in a directory is always the primary image; index 1, when
/// present, the gain map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpfEntry {
    /// Image attribute word (format and type flags).
    pub attribute: u32,
    /// Image size in bytes.
    pub size: u32,
    /// Image position: 0 or an absolute buffer offset.
    pub offset: u32,
}

impl MpfEntry {
    /// Classify this entry from its attribute word.
    pub fn kind(&self) -> MpfImageKind {
        MpfImageKind::from_attribute(self.attribute)
    }
}

/// MPF image classification, decoded from an entry's attribute word.
///
/// The low 24 bits of the attribute carry the MP type code; Ultra HDR
/// writes 0x030000 (baseline primary) for the base image and 0x000000
/// (undefined dependent child) for the gain map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpfImageKind {
    /// Baseline MP primary image.
    Primary,
    /// Dependent child image; for Ultra HDR, the gain map.
    GainMap,
    /// Large thumbnail (VGA or full-HD class).
    LargeThumbnail,
    /// Multi-frame panorama component.
    MultiFramePanorama,
    /// Multi-frame disparity (stereo) component.
    MultiFrameDisparity,
    /// Multi-frame multi-angle component.
    MultiFrameMultiAngle,
    /// Any other attribute word, preserved verbatim.
    Unknown(u32),
}

impl MpfImageKind {
    /// Decode an MP Entry attribute word.
    pub fn from_attribute(attribute: u32) -> Self {
        match attribute & 0x00FF_FFFF {
            0x03_0000 => MpfImageKind::Primary,
            0x00_0000 => MpfImageKind::GainMap,
            0x01_0001 | 0x01_0002 => MpfImageKind::LargeThumbnail,
            0x02_0001 => MpfImageKind::MultiFramePanorama,
            0x02_0002 => MpfImageKind::MultiFrameDisparity,
            0x02_0003 => MpfImageKind::MultiFrameMultiAngle,
            _ => MpfImageKind::Unknown(attribute),
        }
    }

    /// Encode the attribute word written for this kind.
    pub fn to_attribute(self) -> u32 {
        match self {
            MpfImageKind::Primary => 0x03_0000,
            MpfImageKind::GainMap => 0x00_0000,
            MpfImageKind::LargeThumbnail => 0x01_0001,
            MpfImageKind::MultiFramePanorama => 0x02_0001,
            MpfImageKind::MultiFrameDisparity => 0x02_0002,
            MpfImageKind::MultiFrameMultiAngle => 0x02_0003,
            MpfImageKind::Unknown(attribute) => attribute,
        }
    }
}

/// A parsed MPF directory: the sub-image list in stored order.
#[derive(Debug, Clone)]
pub struct MpfDirectory {
    /// Sub-image descriptors; index 0 is the primary image.
    pub entries: Vec<MpfEntry>,
}

/// Find the APP2 segment carrying the MPF container signature.
///
/// Returns `None` when the buffer is a plain single JPEG with no MPF
/// container; that is a normal outcome, not an error. APP2 is shared with other
/// payloads (ICC profile chunks among them), so the 4-byte identifier is
/// the sole discriminator; the payload must also extend past the identifier
/// for a directory to exist behind it.
pub fn find_mpf_segment<'a>(
    data: &[u8],
    segments: &'a [MarkerSegment],
) -> Option<&'a MarkerSegment> {
    segments
        .iter()
        .find(|segment| segment.is_mpf(data) && segment.payload(data).len() > MPF_IDENTIFIER.len())
}

/// Byte order of an MPF directory, from its leading TIFF-style tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Big,
    Little,
}

fn read_u16(dir: &[u8], offset: usize, order: ByteOrder) -> Result<u16> {
    match dir.get(offset..offset + 2) {
        Some(&[a, b]) => Ok(match order {
            ByteOrder::Big => u16::from_be_bytes([a, b]),
            ByteOrder::Little => u16::from_le_bytes([a, b]),
        }),
        _ => Err(Error::MalformedMpf(format!(
            "read past end of directory at offset {offset}"
        ))),
    }
}

fn read_u32(dir: &[u8], offset: usize, order: ByteOrder) -> Result<u32> {
    match dir.get(offset..offset + 4) {
        Some(&[a, b, c, d]) => Ok(match order {
            ByteOrder::Big => u32::from_be_bytes([a, b, c, d]),
            ByteOrder::Little => u32::from_le_bytes([a, b, c, d]),
        }),
        _ => Err(Error::MalformedMpf(format!(
            "read past end of directory at offset {offset}"
        ))),
    }
}

/// Parse the MPF directory carried by a located APP2 segment.
///
/// The directory begins 4 bytes past the `MPF\0` identifier with a
/// TIFF-style byte-order tag (`MM` big-endian, `II` little-endian), an IFD
/// offset relative to the directory start, and a tag/value table whose
/// 0xB002 "MP Image List" entry locates the 16-byte-per-image sub-image
/// records. Any other byte-order tag, a missing image-list tag, or reads
/// that leave the segment payload fail with [`Error::MalformedMpf`].
pub fn parse_mpf_directory(data: &[u8], segment: &MarkerSegment) -> Result<MpfDirectory> {
    let payload = segment.payload(data);
    let dir = match payload.strip_prefix(MPF_IDENTIFIER) {
        Some(rest) => rest,
        None => payload,
    };

    let order = match dir.get(..2) {
        Some(tag) if tag == b"MM" => ByteOrder::Big,
        Some(tag) if tag == b"II" => ByteOrder::Little,
        Some(tag) => {
            return Err(Error::MalformedMpf(format!(
                "unrecognized byte-order tag {:02X}{:02X}",
                tag[0], tag[1]
            )))
        }
        None => return Err(Error::MalformedMpf("directory too short".into())),
    };

    // The IFD offset at directory-start + 4 is relative to the directory
    // start, as are all offsets below.
    let ifd_offset = read_u32(dir, 4, order)? as usize;
    let entry_count = read_u16(dir, ifd_offset, order)? as usize;
    if entry_count > limits::MAX_IFD_ENTRIES {
        return Err(Error::MalformedMpf(format!(
            "IFD entry count {entry_count} exceeds limit"
        )));
    }

    // Walk the 12-byte IFD entries for the MP Image List tag. The field
    // type at +2 is not consulted.
    let mut image_list = None;
    for index in 0..entry_count {
        let at = ifd_offset + 2 + index * 12;
        let tag = read_u16(dir, at, order)?;
        if tag == TAG_MP_ENTRY {
            let value_count = read_u32(dir, at + 4, order)?;
            let value_offset = read_u32(dir, at + 8, order)?;
            image_list = Some((value_count, value_offset));
            break;
        }
    }
    let (value_count, list_offset) = image_list.ok_or_else(|| {
        Error::MalformedMpf("missing MP Image List tag (0xB002)".into())
    })?;

    let image_count = value_count as usize / MP_ENTRY_SIZE;
    if image_count > limits::MAX_SUB_IMAGES {
        return Err(Error::MalformedMpf(format!(
            "sub-image count {image_count} exceeds limit"
        )));
    }

    let mut entries = Vec::with_capacity(image_count);
    for index in 0..image_count {
        let at = list_offset as usize + index * MP_ENTRY_SIZE;
        let attribute = read_u32(dir, at, order)?;
        let size = read_u32(dir, at + 4, order)?;
        let offset = read_u32(dir, at + 8, order)?;
        // The two dependent-image entry numbers at +12 are not consumed.
        entries.push(MpfEntry {
            attribute,
            size,
            offset,
        });
    }

    Ok(MpfDirectory { entries })
}

fn write_ifd_entry(buf: &mut Vec<u8>, tag: u16, field_type: u16, count: u32, value: u32) {
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(&field_type.to_be_bytes());
    buf.extend_from_slice(&count.to_be_bytes());
    buf.extend_from_slice(&value.to_be_bytes());
}

fn write_mp_entry(buf: &mut Vec<u8>, kind: MpfImageKind, size: u32, offset: u32) {
    buf.extend_from_slice(&kind.to_attribute().to_be_bytes());
    buf.extend_from_slice(&size.to_be_bytes());
    buf.extend_from_slice(&offset.to_be_bytes());
    // No dependent-image entry numbers.
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
}

/// Build the MPF APP2 segment for a primary + gain-map pair.
///
/// `primary_size` is the size of the primary image as it will appear in the
/// output, which includes this segment's own [`MPF_SEGMENT_SIZE`] bytes.
/// The gain map entry's offset is written as an absolute offset from the
/// start of the file, i.e. `primary_size`, matching where [`assemble`]
/// places it. The directory is written big-endian.
pub fn write_mpf_header(primary_size: u32, gainmap_size: u32) -> Vec<u8> {
    let mut dir = Vec::with_capacity(MPF_SEGMENT_SIZE - 8);

    // TIFF-style header: byte order, 0x002A, offset to first IFD.
    dir.extend_from_slice(b"MM");
    dir.extend_from_slice(&0x002Au16.to_be_bytes());
    dir.extend_from_slice(&8u32.to_be_bytes());

    // IFD: version, number of images, MP Entry list.
    dir.extend_from_slice(&3u16.to_be_bytes());
    write_ifd_entry(&mut dir, TAG_VERSION, TYPE_UNDEFINED, 4, {
        // Version is 4 bytes and stored inline in the value field.
        u32::from_be_bytes([MPF_VERSION[0], MPF_VERSION[1], MPF_VERSION[2], MPF_VERSION[3]])
    });
    write_ifd_entry(&mut dir, TAG_NUMBER_OF_IMAGES, TYPE_LONG, 1, 2);
    // Image list lives right after the IFD: header (8) + count (2) +
    // 3 entries (36) + next-IFD pointer (4).
    let list_offset = 8 + 2 + 36 + 4;
    write_ifd_entry(
        &mut dir,
        TAG_MP_ENTRY,
        TYPE_UNDEFINED,
        (2 * MP_ENTRY_SIZE) as u32,
        list_offset,
    );

    // Next IFD offset: none.
    dir.extend_from_slice(&0u32.to_be_bytes());

    write_mp_entry(&mut dir, MpfImageKind::Primary, primary_size, 0);
    write_mp_entry(&mut dir, MpfImageKind::GainMap, gainmap_size, primary_size);

    let mut segment = Vec::with_capacity(MPF_SEGMENT_SIZE);
    segment.extend_from_slice(&[0xFF, 0xE2]);
    let length = (2 + MPF_IDENTIFIER.len() + dir.len()) as u16;
    segment.extend_from_slice(&length.to_be_bytes());
    segment.extend_from_slice(MPF_IDENTIFIER);
    segment.extend_from_slice(&dir);

    debug_assert_eq!(segment.len(), MPF_SEGMENT_SIZE);
    segment
}

/// Compose a two-image MPF container from a primary JPEG and a gain-map
/// JPEG.
///
/// Splices a freshly written MPF APP2 segment into the primary after its
/// leading APP0/APP1 segments and appends the gain map after the primary's
/// EOI. Entropy-coded data is copied verbatim; nothing is re-encoded. The
/// inverse of [`crate::extract::split_image`].
pub fn assemble(primary: &[u8], gainmap: &[u8]) -> Result<Vec<u8>> {
    if gainmap.len() < 2 || gainmap[0] != 0xFF || gainmap[1] != SOI {
        return Err(Error::NotAJpeg);
    }
    let segments = scan_markers(primary)?;

    // MPF belongs after the JFIF/EXIF/XMP segments that open the file.
    let mut insert_at = 2;
    for segment in &segments[1..] {
        if segment.code == APP0 || segment.code == APP1 {
            insert_at = segment.span().end;
        } else {
            break;
        }
    }

    let primary_size = primary.len() + MPF_SEGMENT_SIZE;
    let total = primary_size + gainmap.len();
    if u32::try_from(total).is_err() {
        return Err(Error::InvalidAssembly(format!(
            "container size {total} exceeds the MPF u32 offset range"
        )));
    }

    let header = write_mpf_header(primary_size as u32, gainmap.len() as u32);

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&primary[..insert_at]);
    out.extend_from_slice(&header);
    out.extend_from_slice(&primary[insert_at..]);
    out.extend_from_slice(gainmap);
    Ok(out)
}
