use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    #[default]
    Initial,
    Corrective,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Corrective => "corrective",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initial" => Some(Self::Initial),
            "corrective" => Some(Self::Corrective),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Initial => "Initial",
            Self::Corrective => "Correctif",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
