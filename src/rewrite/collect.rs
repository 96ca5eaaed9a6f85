//! Measurement pass: finds every indefinite construct (and every
//! definite construct whose content grows because of one), recording
//! how many bytes it will occupy once rewritten.

use std::io::Read;

use crate::ber::header::decode_identifier;
use crate::ber::length::{Length, decode_length, encoded_length_len};
use crate::error::{ConvertError, ConvertResult};
use crate::io::CountingReader;

use super::{Budget, RewriteEntry, RewriteList, charge};

/// Measures one sibling group under `budget`, pushing a [`RewriteEntry`]
/// for every constructed item that needs its length rewritten. Returns
/// `(original_span, definite_span)` for everything consumed by this
/// invocation, excluding the caller's own header (the caller accounts
/// for that).
pub fn measure<R: Read>(
    reader: &mut CountingReader<R>,
    mut budget: Budget,
    entries: &mut RewriteList,
) -> ConvertResult<(u64, u64)> {
    let mut original_span = 0u64;
    let mut definite_span = 0u64;

    loop {
        let header_offset = reader.offset();
        let identifier = decode_identifier(reader)?;
        let tag_len = identifier.bytes.len() as u64;
        original_span += tag_len;
        definite_span += tag_len;
        charge(&mut budget, tag_len, header_offset)?;

        let length_offset = reader.offset();
        let decoded_length = decode_length(reader)?;
        let length_len = decoded_length.bytes.len() as u64;
        original_span += length_len;
        definite_span += length_len;
        charge(&mut budget, length_len, length_offset)?;

        if identifier.is_eoc_tag() && decoded_length.bytes == [0x00] {
            match budget {
                Budget::Indefinite => {
                    definite_span -= 2;
                    break;
                }
                _ => return Err(ConvertError::UnexpectedEoc { offset: header_offset }),
            }
        }

        match decoded_length.length {
            Length::Definite(value) => {
                if identifier.constructed {
                    // Reserve this item's slot now, at its pre-order
                    // position, even though we only learn whether it
                    // actually needs rewriting after recursing.
                    let slot = entries.len();
                    entries.push_back(RewriteEntry {
                        input_offset: length_offset,
                        was_indefinite: false,
                        original_span: 0,
                        definite_span: 0,
                    });

                    let (child_orig, child_def) =
                        measure(reader, Budget::Definite(value as i64), entries)?;
                    original_span += child_orig;

                    if child_def != value {
                        let new_header_len = encoded_length_len(child_def) as u64;
                        // `length_len` was already added to `definite_span` above;
                        // swap it out for the replacement header's width.
                        definite_span += child_def + new_header_len - length_len;
                        entries[slot].original_span = value;
                        entries[slot].definite_span = child_def;
                    } else {
                        definite_span += child_def;
                        entries.remove(slot);
                    }
                } else {
                    reader.skip(value)?;
                    original_span += value;
                    definite_span += value;
                }
                charge(&mut budget, value, header_offset)?;
            }
            Length::Indefinite => {
                if !identifier.constructed {
                    return Err(ConvertError::PrimitiveIndefinite { offset: header_offset });
                }

                let slot = entries.len();
                entries.push_back(RewriteEntry {
                    input_offset: length_offset,
                    was_indefinite: true,
                    original_span: 0,
                    definite_span: 0,
                });

                let (child_orig, child_def) = measure(reader, Budget::Indefinite, entries)?;
                original_span += child_orig;

                let new_header_len = encoded_length_len(child_def) as u64;
                // The `0x80` marker already contributed 1 byte above.
                definite_span += child_def + new_header_len - 1;

                entries[slot].original_span = child_orig;
                entries[slot].definite_span = child_def;

                charge(&mut budget, child_orig, header_offset)?;
            }
        }

        match budget {
            Budget::Top => break,
            Budget::Definite(0) => break,
            _ => {}
        }
    }

    Ok((original_span, definite_span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn measure_all(input: &[u8]) -> (u64, u64, RewriteList) {
        let mut reader = CountingReader::new(Cursor::new(input));
        let mut entries = RewriteList::new();
        let (orig, def) = measure(&mut reader, Budget::Top, &mut entries).unwrap();
        (orig, def, entries)
    }

    #[test]
    fn trivial_primitive_unchanged() {
        let (orig, def, entries) = measure_all(&[0x04, 0x03, 0x41, 0x42, 0x43]);
        assert_eq!(orig, 5);
        assert_eq!(def, 5);
        assert!(entries.is_empty());
    }

    #[test]
    fn definite_constructed_unchanged() {
        let input = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
        let (orig, def, entries) = measure_all(&input);
        assert_eq!(orig, 8);
        assert_eq!(def, 8);
        assert!(entries.is_empty());
    }

    #[test]
    fn indefinite_constructed_two_primitive_children() {
        let input = [0x30, 0x80, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02, 0x00, 0x00];
        let (orig, def, entries) = measure_all(&input);
        assert_eq!(orig, 10);
        assert_eq!(def, 8);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].input_offset, 1);
        assert_eq!(entries[0].original_span, 8);
        assert_eq!(entries[0].definite_span, 6);
        assert!(entries[0].was_indefinite);
    }

    #[test]
    fn nested_indefinite() {
        let input = [
            0x30, 0x80, 0x30, 0x80, 0x04, 0x01, 0x41, 0x00, 0x00, 0x00, 0x00,
        ];
        let (orig, def, entries) = measure_all(&input);
        assert_eq!(orig, 11);
        assert_eq!(def, 7);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].input_offset, 1);
        assert_eq!(entries[0].definite_span, 5);
        assert_eq!(entries[1].input_offset, 3);
        assert_eq!(entries[1].definite_span, 3);
    }

    #[test]
    fn primitive_indefinite_is_illegal() {
        let mut reader = CountingReader::new(Cursor::new(&[0x04u8, 0x80][..]));
        let mut entries = RewriteList::new();
        let err = measure(&mut reader, Budget::Top, &mut entries).unwrap_err();
        assert!(matches!(err, ConvertError::PrimitiveIndefinite { offset: 0 }));
    }

    #[test]
    fn definite_parent_of_indefinite_child_is_rewritten() {
        // SEQUENCE (definite, len=7) { SEQUENCE (indefinite) { OCTET
        // STRING "A" } EOC }  -- the outer length must also be rewritten
        // once the inner indefinite child collapses to 3 content bytes.
        let input = [
            0x30, 0x07, 0x30, 0x80, 0x04, 0x01, 0x41, 0x00, 0x00,
        ];
        let mut reader = CountingReader::new(Cursor::new(&input[..]));
        let mut entries = RewriteList::new();
        let (orig, def) = measure(&mut reader, Budget::Top, &mut entries).unwrap();
        assert_eq!(orig, 9);
        assert_eq!(def, 7);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].input_offset, 1);
        assert!(!entries[0].was_indefinite);
        assert_eq!(entries[0].definite_span, 5);
        assert_eq!(entries[1].input_offset, 3);
        assert!(entries[1].was_indefinite);
        assert_eq!(entries[1].definite_span, 3);
    }

    #[test]
    fn cascading_definite_parents_of_indefinite_child_are_all_rewritten() {
        // SEQUENCE (def, len=9) { SEQUENCE (def, len=7) { SEQUENCE
        // (indefinite) { OCTET STRING "A" } EOC } } -- both definite
        // ancestors must shrink to match the inner rewrite, not just the
        // immediate parent.
        let input = [
            0x30, 0x09, 0x30, 0x07, 0x30, 0x80, 0x04, 0x01, 0x41, 0x00, 0x00,
        ];
        let (orig, def, entries) = measure_all(&input);
        assert_eq!(orig, 11);
        assert_eq!(def, 9);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].input_offset, 1);
        assert!(!entries[0].was_indefinite);
        assert_eq!(entries[0].definite_span, 7);
        assert_eq!(entries[1].input_offset, 3);
        assert!(!entries[1].was_indefinite);
        assert_eq!(entries[1].definite_span, 5);
        assert_eq!(entries[2].input_offset, 5);
        assert!(entries[2].was_indefinite);
        assert_eq!(entries[2].definite_span, 3);
    }
}
