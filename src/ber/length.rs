//! BER length octets — short form, long (definite) form, and indefinite
//! form.

use std::io::Read;

use crate::error::{ConvertError, ConvertResult};
use crate::io::CountingReader;

/// Maximum number of length-value octets accepted in long definite form
/// while *decoding* (§4.1.2). Re-encoding (§4.1.3) tolerates a wider
/// range since a rewritten length can legitimately need more octets
/// than any length this tool was able to read in.
const MAX_DECODE_LENGTH_OCTETS: usize = 4;
const MAX_ENCODE_LENGTH_OCTETS: usize = 7;

/// A decoded length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Definite(u64),
    Indefinite,
}

/// The raw length octets as read, verbatim — preserved on output unless
/// the value this length describes needs to be rewritten.
pub struct DecodedLength {
    pub length: Length,
    pub bytes: Vec<u8>,
}

/// Decodes 1-5 length octets from `reader`, advancing its position.
pub fn decode_length<R: Read>(reader: &mut CountingReader<R>) -> ConvertResult<DecodedLength> {
    let offset = reader.offset();
    let first = reader.read_u8()?;

    if first & 0x80 == 0 {
        return Ok(DecodedLength {
            length: Length::Definite(first as u64),
            bytes: vec![first],
        });
    }

    let n = (first & 0x7F) as usize;
    if n == 0 {
        return Ok(DecodedLength {
            length: Length::Indefinite,
            bytes: vec![first],
        });
    }

    if n > MAX_DECODE_LENGTH_OCTETS {
        return Err(ConvertError::LengthTooLarge { offset });
    }

    let mut bytes = vec![first];
    let mut value: u64 = 0;
    for _ in 0..n {
        let b = reader.read_u8()?;
        bytes.push(b);
        value = (value << 8) | b as u64;
    }

    Ok(DecodedLength {
        length: Length::Definite(value),
        bytes,
    })
}

/// Encodes `value` as the shortest BER definite length, short form below
/// 128 and long form otherwise. `offset` is only used to label a
/// `LengthTooLarge` error with the input position this length
/// corresponds to.
pub fn encode_length(value: u64, offset: u64) -> ConvertResult<Vec<u8>> {
    if value <= 127 {
        return Ok(vec![value as u8]);
    }

    let significant = value.to_be_bytes();
    let first_nonzero = significant.iter().position(|&b| b != 0).unwrap_or(7);
    let n = 8 - first_nonzero;
    if n > MAX_ENCODE_LENGTH_OCTETS {
        return Err(ConvertError::LengthTooLarge { offset });
    }

    let mut out = Vec::with_capacity(n + 1);
    out.push(0x80 | n as u8);
    out.extend_from_slice(&significant[first_nonzero..]);
    Ok(out)
}

/// Number of octets `encode_length` would emit for `value`, without
/// allocating the buffer. Used by the measurement pass to compute
/// header-width deltas.
pub fn encoded_length_len(value: u64) -> usize {
    if value <= 127 {
        1
    } else {
        let bytes = value.to_be_bytes();
        let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(7);
        1 + (8 - first_nonzero)
    }
}
