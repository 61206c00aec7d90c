//! Top-level error type.

use super::ledger::LedgerError;
use super::registry::RegistryError;

/// Top-level error type for alphaledger.
///
/// Protocol violations (`Ledger`, `Registry`) always propagate: silently
/// correcting them would hide a double-counted or lost position.
#[derive(Debug, thiserror::Error)]
pub enum AlphaledgerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {instrument}")]
    NoData { instrument: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AlphaledgerError> for std::process::ExitCode {
    fn from(err: &AlphaledgerError) -> Self {
        let code: u8 = match err {
            AlphaledgerError::Io(_) => 1,
            AlphaledgerError::ConfigParse { .. }
            | AlphaledgerError::ConfigMissing { .. }
            | AlphaledgerError::ConfigInvalid { .. } => 2,
            AlphaledgerError::Data { .. } | AlphaledgerError::NoData { .. } => 3,
            AlphaledgerError::Ledger(_) | AlphaledgerError::Registry(_) => 4,
        };
        std::process::ExitCode::from(code)
    }
}
