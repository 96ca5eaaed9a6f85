//! Emission pass: re-reads the input from the start and writes the
//! definite-length output, consulting the [`RewriteEntry`] list built by
//! [`super::collect::measure`] for every item whose length changed.

use std::io::{Read, Write};

use crate::ber::header::decode_identifier;
use crate::ber::length::{Length, decode_length, encode_length};
use crate::error::{ConvertError, ConvertResult};
use crate::io::CountingReader;

use super::{Budget, RewriteList, charge};

/// Writes one sibling group under `budget`. `entries` is drained in
/// ascending-offset order as items needing a rewritten length are
/// encountered; a mismatch between the two passes' view of the stream is
/// a bug, not a malformed-input condition, hence [`ConvertError::ListDesync`].
pub fn emit<R: Read, W: Write>(
    reader: &mut CountingReader<R>,
    sink: &mut W,
    mut budget: Budget,
    entries: &mut RewriteList,
) -> ConvertResult<()> {
    loop {
        let header_offset = reader.offset();
        let identifier = decode_identifier(reader)?;
        let tag_len = identifier.bytes.len() as u64;
        charge(&mut budget, tag_len, header_offset)?;

        let length_offset = reader.offset();
        let decoded_length = decode_length(reader)?;
        let length_len = decoded_length.bytes.len() as u64;
        charge(&mut budget, length_len, length_offset)?;

        if identifier.is_eoc_tag() && decoded_length.bytes == [0x00] {
            match budget {
                Budget::Indefinite => break,
                _ => return Err(ConvertError::UnexpectedEoc { offset: header_offset }),
            }
        }

        let rewrite = match entries.front() {
            Some(entry) if entry.input_offset == length_offset => entries.pop_front(),
            Some(entry) if entry.input_offset < length_offset => {
                return Err(ConvertError::ListDesync {
                    expected: length_offset,
                    found: entry.input_offset,
                });
            }
            _ => None,
        };

        sink.write_all(&identifier.bytes)?;

        if let Some(entry) = rewrite {
            let new_length_bytes = encode_length(entry.definite_span, length_offset)?;
            sink.write_all(&new_length_bytes)?;
            if entry.was_indefinite {
                emit(reader, sink, Budget::Indefinite, entries)?;
            } else {
                emit(reader, sink, Budget::Definite(entry.original_span as i64), entries)?;
            }
            charge(&mut budget, entry.original_span, header_offset)?;
        } else {
            sink.write_all(&decoded_length.bytes)?;
            match decoded_length.length {
                Length::Definite(value) => {
                    if identifier.constructed {
                        emit(reader, sink, Budget::Definite(value as i64), entries)?;
                    } else {
                        reader.copy_to(sink, value)?;
                    }
                    charge(&mut budget, value, header_offset)?;
                }
                Length::Indefinite => {
                    // Measurement pushes a rewrite entry for every
                    // indefinite item it sees, so a consistent
                    // (entries, input) pair never reaches this arm.
                    return Err(ConvertError::ListDesync {
                        expected: length_offset,
                        found: length_offset,
                    });
                }
            }
        }

        match budget {
            Budget::Top => break,
            Budget::Definite(0) => break,
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::RewriteList;
    use crate::rewrite::collect::measure;
    use std::io::Cursor;

    fn convert_top(input: &[u8]) -> Vec<u8> {
        let mut reader = CountingReader::new(Cursor::new(input));
        let mut entries = RewriteList::new();
        measure(&mut reader, Budget::Top, &mut entries).unwrap();
        reader.rewind().unwrap();
        let mut out = Vec::new();
        emit(&mut reader, &mut out, Budget::Top, &mut entries).unwrap();
        out
    }

    #[test]
    fn trivial_primitive_unchanged() {
        let input = [0x04, 0x03, 0x41, 0x42, 0x43];
        assert_eq!(convert_top(&input), input);
    }

    #[test]
    fn definite_constructed_unchanged() {
        let input = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
        assert_eq!(convert_top(&input), input);
    }

    #[test]
    fn indefinite_constructed_two_primitive_children() {
        let input = [0x30, 0x80, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02, 0x00, 0x00];
        let expected = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
        assert_eq!(convert_top(&input), expected);
    }

    #[test]
    fn nested_indefinite() {
        let input = [
            0x30, 0x80, 0x30, 0x80, 0x04, 0x01, 0x41, 0x00, 0x00, 0x00, 0x00,
        ];
        let expected = [0x30, 0x05, 0x30, 0x03, 0x04, 0x01, 0x41];
        assert_eq!(convert_top(&input), expected);
    }

    #[test]
    fn definite_parent_of_indefinite_child_is_rewritten() {
        let input = [
            0x30, 0x07, 0x30, 0x80, 0x04, 0x01, 0x41, 0x00, 0x00,
        ];
        let expected = [0x30, 0x05, 0x30, 0x03, 0x04, 0x01, 0x41];
        assert_eq!(convert_top(&input), expected);
    }

    #[test]
    fn cascading_definite_parents_of_indefinite_child_are_all_rewritten() {
        let input = [
            0x30, 0x09, 0x30, 0x07, 0x30, 0x80, 0x04, 0x01, 0x41, 0x00, 0x00,
        ];
        let expected = [0x30, 0x07, 0x30, 0x05, 0x30, 0x03, 0x04, 0x01, 0x41];
        assert_eq!(convert_top(&input), expected);
    }

    #[test]
    fn long_form_length_stays_long_form_when_unchanged() {
        // OCTET STRING of 200 bytes: length octets 0x81 0xC8, definite
        // throughout, nothing to rewrite.
        let mut input = vec![0x04u8, 0x81, 0xC8];
        input.extend(std::iter::repeat(0x41u8).take(200));
        assert_eq!(convert_top(&input), input);
    }
}
