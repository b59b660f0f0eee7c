//! Error types for LoreCortex
//!
//! Extraction and detection are pure parsing logic; the only runtime failure
//! is the input-length guard. Everything else here serves config loading and
//! the WASM boundary.

/// LoreCortex error types
#[derive(Debug, Clone, PartialEq)]
pub enum LoreError {
    /// Input text exceeds `LoreConfig::max_input_chars`
    InputTooLarge { len: usize, max: usize },
    InvalidConfig(String),
    Serialization(String),
}

impl std::fmt::Display for LoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoreError::InputTooLarge { len, max } => {
                write!(f, "Input too large: {} chars (max {})", len, max)
            }
            LoreError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            LoreError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for LoreError {}

impl From<serde_json::Error> for LoreError {
    fn from(e: serde_json::Error) -> Self {
        LoreError::Serialization(e.to_string())
    }
}

pub type LoreResult<T> = Result<T, LoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_input_too_large() {
        let err = LoreError::InputTooLarge { len: 12, max: 10 };
        assert_eq!(err.to_string(), "Input too large: 12 chars (max 10)");
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: LoreError = parse.unwrap_err().into();
        assert!(matches!(err, LoreError::Serialization(_)));
    }
}
