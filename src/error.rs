//! Common error types.

/// Error type for cell related errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// A read requested more bits or bytes than remain in the cursor.
    #[error("not enough bits remaining")]
    OutOfRange,
    /// A write would exceed the bit or reference capacity of a builder.
    #[error("cell capacity exceeded")]
    CapacityExceeded,
    /// A cell tree is deeper than the format maximum.
    #[error("cell depth exceeded")]
    DepthExceeded,
    /// A reference load was attempted with none remaining.
    #[error("no more references")]
    NoMoreReferences,
    /// `end_parse` was called while bits or references remained.
    #[error("slice was not fully consumed")]
    NotFullyConsumed,
    /// A key or value coder received a value it cannot represent
    /// in its declared width.
    #[error("type mismatch")]
    TypeMismatch,
    /// A dictionary fork node is missing one of its branches.
    #[error("missing dictionary branch")]
    MissingBranch,
    /// A fixed-width key coder received a bitstring of the wrong length.
    #[error("bitstring length mismatch")]
    BitstringLengthMismatch,
    /// A buffer had an unexpected byte count.
    #[error("invalid buffer size")]
    InvalidBufferSize,
    /// Data does not satisfy some structural constraint.
    #[error("invalid data")]
    InvalidData,
}
