use thiserror::Error;

/// Crate-wide result alias, mirroring how the BER codec keeps a single
/// result type rather than scattering `Result<_, _>` through every
/// signature.
pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("unexpected end of input at offset {offset}")]
    Truncation { offset: u64 },

    #[error("tag number spans more than 4 continuation octets at offset {offset}")]
    TagTooLarge { offset: u64 },

    #[error("length field spans more than 4 length-value octets at offset {offset}")]
    LengthTooLarge { offset: u64 },

    #[error("primitive tag with indefinite length at offset {offset}")]
    PrimitiveIndefinite { offset: u64 },

    #[error("end-of-contents marker outside an indefinite-length region at offset {offset}")]
    UnexpectedEoc { offset: u64 },

    #[error("content at offset {offset} overruns its parent's definite length by {by} bytes")]
    LengthOverrun { offset: u64, by: u64 },

    #[error("indefinite-length bookkeeping desynced: expected entry at offset {expected}, found one recorded for offset {found}")]
    ListDesync { expected: u64, found: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
