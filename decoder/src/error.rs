/// Everything that can go wrong while reading map data out of a ROM image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("offset 0x{offset:06X} is outside the ROM image (0x{len:06X} bytes)")]
    OutOfRange { offset: usize, len: usize },

    #[error("position stack underflow: pop without a matching push")]
    StackUnderflow,

    #[error("pointer 0x{pointer:08X} resolves outside the ROM image (0x{len:06X} bytes)")]
    MalformedPointer { pointer: u32, len: usize },

    #[error("decode failure: {0}")]
    DecodeFailure(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
