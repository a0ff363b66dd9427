#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An invalid combination of sizes, depths, or flags.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A mandatory fixed-size read came up short.
    #[error("Not enough bytes")]
    NotEnoughData { actual: usize, minimum: usize },

    /// The very first read failed, so the stream is not of the expected kind.
    #[error("not a recognized packet stream")]
    BadFileType,

    /// A packet failed header validation.
    #[error("invalid packet at index {index}: {reason}")]
    InvalidPacket { index: usize, reason: String },

    /// A text token that cannot be interpreted as a bit value.
    #[error("invalid token: {0:?}")]
    InvalidToken(String),

    /// A declared-length allocation failed.
    #[error("failed to allocate {0} bytes")]
    Memory(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
