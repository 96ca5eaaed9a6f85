//! The two-pass indefinite-to-definite BER rewrite.
//!
//! [`collect`] measures every indefinite construct (and any definite
//! construct whose content grows because of a nested indefinite one);
//! [`emit`] re-reads the input and writes the output, substituting
//! definite lengths wherever [`collect`] found a reason to.

pub mod collect;
pub mod emit;

use std::collections::VecDeque;
use std::io::{Read, Seek, Write};

use crate::error::ConvertResult;
use crate::io::CountingReader;

/// How much of the current constructed value's content remains to be
/// consumed by the current recursive invocation.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Budget {
    /// Process exactly one outermost TLV, then stop (trailing bytes, if
    /// any, are left unread).
    Top,
    /// A definite-length parent with `remaining` content bytes left.
    Definite(i64),
    /// An indefinite-length parent: keep going until an EOC marker.
    Indefinite,
}

/// A constructed item whose declared length must be rewritten: either it
/// was originally indefinite, or one of its descendants was indefinite
/// and grew (or shrank) on re-encoding, changing this item's own content
/// size even though it was already definite-length in the input.
#[derive(Debug, Clone, Copy)]
pub struct RewriteEntry {
    /// Offset of this item's length octet in the input.
    pub input_offset: u64,
    /// Whether the original length field was `0x80` (indefinite) — if
    /// so, emission must consume and discard a trailing end-of-contents
    /// marker rather than treat the content as a fixed-count run.
    pub was_indefinite: bool,
    /// Number of content bytes to read from the input for this item (for
    /// a formerly-indefinite item this includes the trailing `00 00`).
    pub original_span: u64,
    /// Number of content bytes this item occupies after rewriting — the
    /// value BER-encoded as its new length.
    pub definite_span: u64,
}

/// Ordered by ascending `input_offset`, i.e. pre-order of the constructed
/// tree — exactly the order emission will want to consume them in.
pub type RewriteList = VecDeque<RewriteEntry>;

#[derive(Debug, Clone, Copy)]
pub struct ConvertStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Runs the two-pass conversion. `source` must support rewinding to 0
/// between passes. `whole_file` selects §4.4's "convert whole file" mode
/// (every top-level sibling, budgeted by the file's total size) over the
/// default "single top-level value" mode.
pub fn convert<R: Read + Seek, W: Write>(
    source: R,
    sink: &mut W,
    whole_file: bool,
) -> ConvertResult<ConvertStats> {
    let mut reader = CountingReader::new(source);

    let top_budget = if whole_file {
        Budget::Definite(reader.len()? as i64)
    } else {
        Budget::Top
    };

    let mut entries = RewriteList::new();
    let (bytes_read, bytes_written) = collect::measure(&mut reader, top_budget, &mut entries)?;

    reader.rewind()?;
    let top_budget = if whole_file {
        Budget::Definite(bytes_read as i64)
    } else {
        Budget::Top
    };
    emit::emit(&mut reader, sink, top_budget, &mut entries)?;
    sink.flush()?;

    Ok(ConvertStats {
        bytes_read,
        bytes_written,
    })
}

/// Subtracts `amount` from a `Definite` budget, no-op otherwise. Shared
/// by both passes so the overrun check can't drift between them.
pub(crate) fn charge(
    budget: &mut Budget,
    amount: u64,
    offset: u64,
) -> ConvertResult<()> {
    if let Budget::Definite(remaining) = budget {
        *remaining -= amount as i64;
        if *remaining < 0 {
            return Err(crate::error::ConvertError::LengthOverrun {
                offset,
                by: (-*remaining) as u64,
            });
        }
    }
    Ok(())
}
