use log::{info, warn};
use std::error;
use std::fmt;
use std::io;

mod check;
mod scanner;

pub use check::{check_codestream_completeness, check_required_boxes, RequiredBoxes};
pub use scanner::{decode_box_header, scan_boxes, BoxHeader, BoxScanner, Jp2Box};

#[derive(Debug, PartialEq, Eq)]
pub enum JP2Error {
    BoxHeaderTruncated {
        offset: u64,
        needed: u64,
        remaining: u64,
    },
    BoxLengthInvalid {
        box_type: BoxType,
        offset: u64,
        length: u64,
    },
    BoxOverflow {
        box_type: BoxType,
        offset: u64,
        length: u64,
        remaining: u64,
    },
}

impl error::Error for JP2Error {}
impl fmt::Display for JP2Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BoxHeaderTruncated {
                offset,
                needed,
                remaining,
            } => {
                write!(
                    f,
                    "malformed box at offset {}: header needs {} bytes but only {} remain",
                    offset, needed, remaining
                )
            }
            Self::BoxLengthInvalid {
                box_type,
                offset,
                length,
            } => {
                write!(
                    f,
                    "malformed box type \"{}\" at offset {}: length {} is shorter than its header",
                    box_type_name(*box_type),
                    offset,
                    length
                )
            }
            Self::BoxOverflow {
                box_type,
                offset,
                length,
                remaining,
            } => {
                write!(
                    f,
                    "malformed box type \"{}\" at offset {}: length {} exceeds the {} bytes remaining",
                    box_type_name(*box_type),
                    offset,
                    length,
                    remaining
                )
            }
        }
    }
}

pub type BoxType = [u8; 4];

// jP\040\040 (0x6A50 2020)
pub const BOX_TYPE_SIGNATURE: BoxType = [106, 80, 32, 32];
// ftyp (0x6674 7970)
pub const BOX_TYPE_FILE_TYPE: BoxType = [102, 116, 121, 112];
// jp2h (0x6A70 3268)
pub const BOX_TYPE_HEADER: BoxType = [106, 112, 50, 104];
// jp2c (0x6A70 3263)
pub const BOX_TYPE_CONTIGUOUS_CODESTREAM: BoxType = [106, 112, 50, 99];
pub const BOX_TYPE_INTELLECTUAL_PROPERTY: BoxType = [106, 112, 50, 105];
pub const BOX_TYPE_XML: BoxType = [120, 109, 108, 32];
pub const BOX_TYPE_UUID: BoxType = [117, 117, 105, 100];
pub const BOX_TYPE_UUID_INFO: BoxType = [117, 105, 110, 102];

/// Top-level boxes every JP2 file shall contain.
///
/// The order is the order in which missing boxes are reported, which is
/// independent of the order boxes appear in a file.
///
/// For more information, see ISO/IEC 15444-1 / ITU T-800 Appendix I.5.
pub const REQUIRED_BOX_TYPES: [BoxType; 4] = [
    BOX_TYPE_SIGNATURE,
    BOX_TYPE_FILE_TYPE,
    BOX_TYPE_HEADER,
    BOX_TYPE_CONTIGUOUS_CODESTREAM,
];

/// End of codestream marker (0xFFD9).
pub const MARKER_EOC: [u8; 2] = [255, 217];

#[derive(Debug, PartialEq, Eq)]
pub enum BoxTypes {
    Signature,
    FileType,
    Header,
    ContiguousCodestream,
    IntellectualProperty,
    Xml,
    Uuid,
    UUIDInfo,
    Unknown,
}

impl fmt::Display for BoxTypes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl BoxTypes {
    pub fn new(value: BoxType) -> BoxTypes {
        match value {
            BOX_TYPE_SIGNATURE => BoxTypes::Signature,
            BOX_TYPE_FILE_TYPE => BoxTypes::FileType,
            BOX_TYPE_HEADER => BoxTypes::Header,
            BOX_TYPE_CONTIGUOUS_CODESTREAM => BoxTypes::ContiguousCodestream,
            BOX_TYPE_INTELLECTUAL_PROPERTY => BoxTypes::IntellectualProperty,
            BOX_TYPE_XML => BoxTypes::Xml,
            BOX_TYPE_UUID => BoxTypes::Uuid,
            BOX_TYPE_UUID_INFO => BoxTypes::UUIDInfo,
            _ => BoxTypes::Unknown,
        }
    }
}

/// Four character representation of a box type.
///
/// Box types are conventionally printable ISO 646 characters, but a corrupt
/// file may carry anything, so non printable bytes are escaped as `\xNN`.
pub fn box_type_name(box_type: BoxType) -> String {
    box_type
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                (b as char).to_string()
            } else {
                format!("\\x{:02x}", b)
            }
        })
        .collect()
}

/// Outcome of a structural check of a single JP2 file.
///
/// A file lacking required boxes or carrying a truncated codestream is not an
/// error; both are reported here as negative flags.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
    all_required_boxes_found: bool,
    codestream_complete: bool,
    missing_boxes: Vec<BoxType>,
    box_types: Vec<BoxType>,
    codestream_boxes: usize,
}

impl ValidationResult {
    /// True when the Signature, File Type, JP2 Header and Contiguous
    /// Codestream boxes are all present at the top level.
    pub fn all_required_boxes_found(&self) -> bool {
        self.all_required_boxes_found
    }

    /// True when the last Contiguous Codestream box ends with the end of
    /// codestream marker. False when the file has no codestream at all.
    pub fn codestream_complete(&self) -> bool {
        self.codestream_complete
    }

    /// Missing required boxes, in [`REQUIRED_BOX_TYPES`] order.
    pub fn missing_boxes(&self) -> &[BoxType] {
        &self.missing_boxes
    }

    /// Types of all top-level boxes in file order.
    pub fn box_types(&self) -> &[BoxType] {
        &self.box_types
    }

    pub fn codestream_boxes(&self) -> usize {
        self.codestream_boxes
    }
}

/// Check the top-level box structure of a JP2 file held in memory.
///
/// Every top-level box is visited once. The payload of each Contiguous
/// Codestream box is checked for a trailing end of codestream marker, the
/// last one found deciding the result. Once the scan completes the collected
/// box types are checked for the four required boxes.
///
/// Scanning stops at the first malformed box header, which is returned as an
/// error rather than a partial result.
pub fn check_jp2(data: &[u8]) -> Result<ValidationResult, JP2Error> {
    let mut result = ValidationResult::default();

    for jp2_box in scan_boxes(data) {
        let jp2_box = match jp2_box {
            Ok(value) => value,
            Err(error) => {
                warn!("{}", error);
                return Err(error);
            }
        };

        if jp2_box.box_type == BOX_TYPE_CONTIGUOUS_CODESTREAM {
            result.codestream_complete = check_codestream_completeness(jp2_box.payload);
            result.codestream_boxes += 1;
        }

        result.box_types.push(jp2_box.box_type);
    }

    let RequiredBoxes { all_found, missing } = check_required_boxes(&result.box_types);
    result.all_required_boxes_found = all_found;
    result.missing_boxes = missing;

    info!(
        "checked {} boxes, all required boxes found {}, codestream complete {}",
        result.box_types.len(),
        result.all_required_boxes_found,
        result.codestream_complete
    );

    Ok(result)
}

/// Read a JP2 file to the end and check its top-level box structure.
pub fn check_jp2_reader<R: io::Read>(
    reader: &mut R,
) -> Result<ValidationResult, Box<dyn error::Error>> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    Ok(check_jp2(&data)?)
}
