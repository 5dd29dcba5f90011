use std::io;

use thiserror::Error;

/// The single error surface of the crate.
///
/// Every parse or build entrypoint returns either its result or one of
/// these. Non-fatal conditions never surface here; they are collected as
/// [Warning]s on the parsed model instead.
#[derive(Debug, Error)]
pub enum RwError {
    #[error("Error reading the file: {0}")]
    IoError(#[from] io::Error),

    #[error("Parsing error: {0}")]
    ParsingError(#[from] binrw::Error),

    #[error("Image decode error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Not a {expected} file: found signature {found:#010x} at offset {offset:#x}")]
    FormatSignature {
        expected: &'static str,
        found: u32,
        offset: u64,
    },

    #[error("Section {section_type:#04x} at offset {offset:#x} declares {declared} bytes but only {available} remain")]
    TruncatedData {
        section_type: u32,
        offset: u64,
        declared: u64,
        available: u64,
    },

    #[error("Expected section {expected:#04x} at offset {offset:#x} but found {found:#04x}")]
    UnexpectedSection {
        expected: u32,
        found: u32,
        offset: u64,
    },

    #[error("Model invariant violated during serialization: {0}")]
    InvariantViolation(String),
}

/// Non-fatal findings attached to a parse result.
///
/// Parsers keep going when they hit one of these; the affected texture or
/// model is retained (with raw bytes where necessary) so a later write
/// still reproduces the file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Warning {
    /// A platform id, format code or version/device pair outside the
    /// known tables. The carrier keeps its raw bytes.
    UnknownVariant { context: String, code: u32 },

    /// A corrupt on-disk field was repaired. Both the original and the
    /// recomputed value are kept on the model.
    RecoveredCorruption {
        context: String,
        header_value: u32,
        recovered_value: u32,
    },

    /// An optional trailing record (bumpmap, reflection, fresnel) failed
    /// validation and was skipped. The cursor was rolled back, so the
    /// surrounding model is unaffected.
    DiscardedTrailer { context: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnknownVariant { context, code } => {
                write!(f, "unknown {context}: {code:#x}")
            }
            Warning::RecoveredCorruption {
                context,
                header_value,
                recovered_value,
            } => write!(
                f,
                "repaired {context}: header said {header_value}, using {recovered_value}"
            ),
            Warning::DiscardedTrailer { context } => {
                write!(f, "discarded malformed trailer: {context}")
            }
        }
    }
}
