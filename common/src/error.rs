use thiserror::Error;

/// Fatal engine errors. Recoverable conditions (fixed-node mutations,
/// out-of-bounds placements) are logged and ignored instead.
#[derive(Debug, Error)]
pub enum PlcError {
    #[error("netlist parse error: {0}")]
    Parse(String),

    #[error("placement validation error: {0}")]
    Validation(String),

    #[error("module index {0} out of range")]
    IndexOutOfRange(usize),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}
