/// Errors that can occur while tracking or polling endpoints.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// `poll` was called with every readiness class disabled.
    #[error("no readiness class requested")]
    NothingToReport,

    /// The select(2) call itself failed.
    #[error("select failed: {0}")]
    Os(#[from] std::io::Error),

    /// select(2) cannot watch descriptors at or above `FD_SETSIZE`.
    #[error("descriptor {descriptor} out of range (limit {max})")]
    DescriptorOutOfRange { descriptor: i32, max: i32 },
}

pub type Result<T> = std::result::Result<T, SelectError>;
