use log::debug;
use std::iter::FusedIterator;

use crate::{box_type_name, BoxType, BoxTypes, JP2Error};

/// Header of a single box.
///
/// `box_length` is the effective length of the whole box, header included,
/// after resolving the extended length and to-end-of-file conventions.
#[derive(Debug, PartialEq, Eq)]
pub struct BoxHeader {
    pub box_length: u64,

    pub box_type: BoxType,

    pub header_length: u8,
}

/// Decode the box header starting at `offset`.
///
/// The header is made of a 4-byte big endian length (LBox), a 4-byte type
/// (TBox) and, when LBox is 1, an 8-byte big endian extended length (XLBox).
/// An LBox of 0 means the box runs to the end of the file.
///
/// The returned length is guaranteed to cover at least the header and to fit
/// within the bytes remaining after `offset`.
///
/// For more information, see ISO/IEC 15444-1 / ITU T-800 Appendix I.4.
pub fn decode_box_header(data: &[u8], offset: usize) -> Result<BoxHeader, JP2Error> {
    let rest = data.get(offset..).unwrap_or(&[]);
    let remaining = rest.len() as u64;

    if rest.len() < 8 {
        return Err(JP2Error::BoxHeaderTruncated {
            offset: offset as u64,
            needed: 8,
            remaining,
        });
    }

    let mut box_length: [u8; 4] = [0; 4];
    let mut box_type: BoxType = [0; 4];
    box_length.copy_from_slice(&rest[0..4]);
    box_type.copy_from_slice(&rest[4..8]);

    let (box_length, header_length) = match u32::from_be_bytes(box_length) {
        0 => (remaining, 8),
        1 => {
            if rest.len() < 16 {
                return Err(JP2Error::BoxHeaderTruncated {
                    offset: offset as u64,
                    needed: 16,
                    remaining,
                });
            }

            let mut xl_length: [u8; 8] = [0; 8];
            xl_length.copy_from_slice(&rest[8..16]);
            (u64::from_be_bytes(xl_length), 16)
        }
        value => (value as u64, 8),
    };

    // Lengths 2 to 7 are reserved, and neither form may be shorter than its
    // own header.
    if box_length < header_length as u64 {
        return Err(JP2Error::BoxLengthInvalid {
            box_type,
            offset: offset as u64,
            length: box_length,
        });
    }

    if box_length > remaining {
        return Err(JP2Error::BoxOverflow {
            box_type,
            offset: offset as u64,
            length: box_length,
            remaining,
        });
    }

    Ok(BoxHeader {
        box_length,
        box_type,
        header_length,
    })
}

/// A top-level box borrowed from the scanned buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Jp2Box<'a> {
    pub box_type: BoxType,
    pub offset: u64,
    pub length: u64,
    pub header_length: u8,

    /// Box contents, excluding the header.
    pub payload: &'a [u8],
}

/// Iterator over the top-level boxes of a JP2 file.
///
/// Yields boxes in file order until the buffer is exhausted. A malformed
/// header is yielded once as an error, after which the scanner is finished;
/// there is no attempt to resynchronise on a later box.
#[derive(Debug)]
pub struct BoxScanner<'a> {
    data: &'a [u8],
    offset: usize,
    finished: bool,
}

impl<'a> BoxScanner<'a> {
    pub fn new(data: &'a [u8]) -> BoxScanner<'a> {
        BoxScanner {
            data,
            offset: 0,
            finished: false,
        }
    }

    /// Offset of the next box to be decoded.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for BoxScanner<'a> {
    type Item = Result<Jp2Box<'a>, JP2Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.offset >= self.data.len() {
            self.finished = true;
            return None;
        }

        let BoxHeader {
            box_length,
            box_type,
            header_length,
        } = match decode_box_header(self.data, self.offset) {
            Ok(value) => value,
            Err(error) => {
                self.finished = true;
                return Some(Err(error));
            }
        };

        // decode_box_header bounds box_length by the bytes remaining
        let data: &'a [u8] = self.data;
        let start = self.offset;
        let end = start + box_length as usize;
        let payload = &data[start + header_length as usize..end];

        debug!(
            "{} box \"{}\" at offset {} length {}",
            BoxTypes::new(box_type),
            box_type_name(box_type),
            start,
            box_length
        );

        self.offset = end;

        Some(Ok(Jp2Box {
            box_type,
            offset: start as u64,
            length: box_length,
            header_length,
            payload,
        }))
    }
}

impl<'a> FusedIterator for BoxScanner<'a> {}

pub fn scan_boxes(data: &[u8]) -> BoxScanner<'_> {
    BoxScanner::new(data)
}
