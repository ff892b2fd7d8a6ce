use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a declaration.
///
/// Variants are ordered the way a declaration moves through them, so
/// `Draft < Validated < Paid`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationStatus {
    #[default]
    Draft,
    Validated,
    Paid,
}

impl DeclarationStatus {
    /// Stable tag used for storage and command-line input.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Validated => "validated",
            Self::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "validated" => Some(Self::Validated),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    /// Label shown to filers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Brouillon",
            Self::Validated => "Validé",
            Self::Paid => "Payé",
        }
    }

    /// Inputs may only change before payment.
    pub fn is_editable(&self) -> bool {
        !matches!(self, Self::Paid)
    }
}

impl fmt::Display for DeclarationStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
