use thiserror::Error;

use crate::model::ArtifactType;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by deckstore maps onto one of these kinds. Each kind
/// has a stable error code usable for programmatic handling and in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Deck validation
    /// Required card(s) missing, or a card is locally malformed
    Syntax,
    /// Card is not legal for the artifact type
    UnsupportedCard,

    // Protocol
    /// Protocol violation: double persist, double commit, write outside a transaction
    Misuse,

    // Resolution
    NotFound,
    TypeMismatch,
    /// Malformed card encoding or an unresolvable baseline chain
    Corrupt,

    // Integration/IO
    Storage,
    Io,
    Serialization,

    /// Allocation failure; carries no message so reporting it does not allocate
    OutOfMemory,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Syntax => "ERR_SYNTAX",
            ExErrorKind::UnsupportedCard => "ERR_UNSUPPORTED_CARD",
            ExErrorKind::Misuse => "ERR_MISUSE",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::Corrupt => "ERR_CORRUPT",
            ExErrorKind::Storage => "ERR_STORAGE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::OutOfMemory => "ERR_OUT_OF_MEMORY",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Classification fields for programmatic handling plus context for
/// debugging. `cards` carries the offending card letters for Syntax and
/// UnsupportedCard errors.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    artifact: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
    cards: Option<Vec<char>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            artifact: None,
            message: String::new(),
            source: None,
            cards: None,
        }
    }

    /// The allocation-failure error.
    ///
    /// Built without touching the heap; callers should not decorate it
    /// further.
    pub fn out_of_memory() -> Self {
        Self::new(ExErrorKind::OutOfMemory)
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add artifact context (reference, uuid or rid)
    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Add the card letters this error is about
    pub fn with_cards(mut self, cards: Vec<char>) -> Self {
        self.cards = Some(cards);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the artifact context, if any
    pub fn artifact(&self) -> Option<&str> {
        self.artifact.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Get the card letters, if any (populated on Syntax/UnsupportedCard)
    pub fn cards(&self) -> Option<&[char]> {
        self.cards.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(artifact) = &self.artifact {
            write!(f, " (artifact: {})", artifact)?;
        }
        if let Some(cards) = &self.cards {
            let letters: String = cards.iter().collect();
            write!(f, " (cards: {})", letters)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for deck building, parsing and persistence
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeckError {
    // ===== Validation =====
    /// Deck lacks cards its type requires
    #[error("{artifact_type} artifact is missing required card(s): {}", letters(.missing))]
    MissingCards {
        artifact_type: ArtifactType,
        missing: Vec<char>,
    },

    /// A card failed local well-formedness checks
    #[error("Invalid {card} card: {reason}")]
    InvalidCard { card: char, reason: String },

    /// Card letter is not legal for the deck's type
    #[error("Card {card} is not supported by {artifact_type} artifacts")]
    UnsupportedCard {
        card: char,
        artifact_type: ArtifactType,
    },

    /// Two F cards with the same name
    #[error("Duplicate file card: {name}")]
    DuplicateFile { name: String },

    /// A deleted-file entry in a deck with no baseline
    #[error("File {name} is marked deleted but the deck has no baseline")]
    TombstoneWithoutBaseline { name: String },

    // ===== Protocol =====
    /// Deck was already persisted (or loaded) and must be reset first
    #[error("Deck already has identity {uuid}; reset before persisting again")]
    AlreadyPersisted { uuid: String },

    /// Guard was already committed or rolled back
    #[error("Transaction guard already finished")]
    GuardFinished,

    /// Commit/rollback/write with no open transaction
    #[error("No active transaction for {op}")]
    NoActiveTransaction { op: String },

    // ===== Resolution =====
    /// Reference did not resolve to stored content
    #[error("Artifact not found: {reference}")]
    ArtifactNotFound { reference: String },

    /// Prefix matches more than one artifact
    #[error("Ambiguous artifact reference: {reference}")]
    AmbiguousReference { reference: String },

    /// Loaded artifact has a different type than requested
    #[error("Expected {expected} artifact but found {actual}")]
    TypeMismatch {
        expected: ArtifactType,
        actual: ArtifactType,
    },

    // ===== Corruption =====
    /// Card text does not parse
    #[error("Malformed artifact at line {line}: {reason}")]
    MalformedCard { line: usize, reason: String },

    /// Z card does not match the content it covers
    #[error("Self-hash mismatch: card says {recorded}, content hashes to {computed}")]
    SelfHashMismatch { recorded: String, computed: String },

    /// Baseline missing or itself a delta
    #[error("Invalid baseline {baseline}: {reason}")]
    BaselineChain { baseline: String, reason: String },

    // ===== Integration =====
    /// Storage backend failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Different bytes stored under an existing hash
    #[error("Content collision for {uuid}")]
    ContentCollision { uuid: String },

    /// Serialization failure in the interop layer
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Allocation failure
    #[error("Out of memory")]
    OutOfMemory,
}

fn letters(cards: &[char]) -> String {
    cards
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Conversion from DeckError to ExError
impl From<DeckError> for ExError {
    fn from(err: DeckError) -> Self {
        let message = err.to_string();
        match err {
            DeckError::MissingCards { missing, .. } => ExError::new(ExErrorKind::Syntax)
                .with_cards(missing)
                .with_message(message),

            DeckError::InvalidCard { card, .. } => ExError::new(ExErrorKind::Syntax)
                .with_cards(vec![card])
                .with_message(message),

            DeckError::UnsupportedCard { card, .. } => ExError::new(ExErrorKind::UnsupportedCard)
                .with_cards(vec![card])
                .with_message(message),

            DeckError::DuplicateFile { name } | DeckError::TombstoneWithoutBaseline { name } => {
                ExError::new(ExErrorKind::Syntax)
                    .with_cards(vec!['F'])
                    .with_artifact(name)
                    .with_message(message)
            }

            DeckError::AlreadyPersisted { uuid } => ExError::new(ExErrorKind::Misuse)
                .with_artifact(uuid)
                .with_message(message),

            DeckError::GuardFinished => ExError::new(ExErrorKind::Misuse).with_message(message),

            DeckError::NoActiveTransaction { op } => ExError::new(ExErrorKind::Misuse)
                .with_op(op)
                .with_message(message),

            DeckError::ArtifactNotFound { reference }
            | DeckError::AmbiguousReference { reference } => ExError::new(ExErrorKind::NotFound)
                .with_artifact(reference)
                .with_message(message),

            DeckError::TypeMismatch { .. } => {
                ExError::new(ExErrorKind::TypeMismatch).with_message(message)
            }

            DeckError::MalformedCard { .. } | DeckError::SelfHashMismatch { .. } => {
                ExError::new(ExErrorKind::Corrupt).with_message(message)
            }

            DeckError::BaselineChain { baseline, .. } => ExError::new(ExErrorKind::Corrupt)
                .with_artifact(baseline)
                .with_message(message),

            DeckError::Storage { .. } => ExError::new(ExErrorKind::Storage).with_message(message),

            DeckError::ContentCollision { uuid } => ExError::new(ExErrorKind::Storage)
                .with_artifact(uuid)
                .with_message(message),

            DeckError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            DeckError::OutOfMemory => ExError::out_of_memory(),
        }
    }
}

/// Conversion from serde_json::Error to DeckError
impl From<serde_json::Error> for DeckError {
    fn from(err: serde_json::Error) -> Self {
        DeckError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from std::collections::TryReserveError to ExError
impl From<std::collections::TryReserveError> for ExError {
    fn from(_: std::collections::TryReserveError) -> Self {
        ExError::out_of_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::Syntax, "ERR_SYNTAX"),
            (ExErrorKind::UnsupportedCard, "ERR_UNSUPPORTED_CARD"),
            (ExErrorKind::Misuse, "ERR_MISUSE"),
            (ExErrorKind::NotFound, "ERR_NOT_FOUND"),
            (ExErrorKind::TypeMismatch, "ERR_TYPE_MISMATCH"),
            (ExErrorKind::Corrupt, "ERR_CORRUPT"),
            (ExErrorKind::Storage, "ERR_STORAGE"),
            (ExErrorKind::OutOfMemory, "ERR_OUT_OF_MEMORY"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_missing_cards_carries_letters() {
        let err: ExError = DeckError::MissingCards {
            artifact_type: ArtifactType::Control,
            missing: vec!['D', 'U'],
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::Syntax);
        assert_eq!(err.cards(), Some(&['D', 'U'][..]));
        assert!(err.message().contains("D U"));
    }

    #[test]
    fn test_out_of_memory_has_no_context() {
        let err = ExError::out_of_memory();
        assert_eq!(err.kind(), ExErrorKind::OutOfMemory);
        assert!(err.message().is_empty());
        assert!(err.op().is_none());
        assert!(err.cards().is_none());
    }

    #[test]
    fn test_display_includes_code_and_op() {
        let err = ExError::new(ExErrorKind::NotFound)
            .with_op("load")
            .with_artifact("tip")
            .with_message("nothing here");
        let text = err.to_string();
        assert!(text.starts_with("[ERR_NOT_FOUND]"));
        assert!(text.contains("'load'"));
        assert!(text.contains("(artifact: tip)"));
    }

    #[test]
    fn test_source_chain() {
        let inner = ExError::new(ExErrorKind::Storage).with_message("disk full");
        let outer = ExError::new(ExErrorKind::Corrupt).with_source(inner);
        assert_eq!(
            outer.source_error().map(|e| e.kind()),
            Some(ExErrorKind::Storage)
        );
    }
}
