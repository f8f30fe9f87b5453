use crate::{BoxType, MARKER_EOC, REQUIRED_BOX_TYPES};

/// Presence of the required top-level boxes.
#[derive(Debug, PartialEq, Eq)]
pub struct RequiredBoxes {
    pub all_found: bool,

    /// Absent required boxes, in [`REQUIRED_BOX_TYPES`] order.
    pub missing: Vec<BoxType>,
}

/// Check that the Signature, File Type, JP2 Header and Contiguous Codestream
/// boxes appear among `box_types`.
///
/// Duplicates and boxes outside the required set are ignored; extra boxes
/// (XML, UUID, vendor specific) are legal anywhere in a JP2 file.
pub fn check_required_boxes(box_types: &[BoxType]) -> RequiredBoxes {
    let missing: Vec<BoxType> = REQUIRED_BOX_TYPES
        .iter()
        .filter(|required| !box_types.contains(*required))
        .copied()
        .collect();

    RequiredBoxes {
        all_found: missing.is_empty(),
        missing,
    }
}

/// Check whether a codestream appears complete.
///
/// A codestream is assumed complete when it ends with the end of codestream
/// marker. This does not catch corruption inside the codestream.
pub fn check_codestream_completeness(codestream: &[u8]) -> bool {
    codestream.ends_with(&MARKER_EOC)
}
