use thiserror::Error;

/// Unified error type for CLI operations.
#[derive(Debug, Error)]
pub enum CliError {
    /// Message or content encoding failed.
    #[error(transparent)]
    Nft(#[from] cookie_nft::NftError),

    /// Cell or BoC handling failed.
    #[error(transparent)]
    Cell(#[from] cookie_cell::CellError),

    /// Configuration file could not be read or parsed.
    #[error("config: {0}")]
    Config(String),

    /// Bad file path, unreadable input, parse failure.
    #[error("input: {0}")]
    Input(String),

    /// Argument / usage errors.
    #[error("usage: {0}")]
    Usage(String),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
