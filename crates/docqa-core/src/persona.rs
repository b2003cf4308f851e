//! System-prompt presets that set the assistant's tone.

use std::fmt;
use std::str::FromStr;

const STRICT_LEGAL_AUDITOR: &str = "You are a strict legal auditor. Answer with precision, citing specific clauses. Do not speculate.";
const TECHNICAL_WRITER: &str = "You are a technical writer. Explain complex concepts clearly and concisely. Use formatting effectively.";
const ONBOARDING_BUDDY: &str = "You are a helpful onboarding buddy. Be welcoming, encouraging, and explain things in simple terms.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Persona {
    #[default]
    StrictLegalAuditor,
    TechnicalWriter,
    OnboardingBuddy,
    Custom(String),
}

impl Persona {
    pub const PRESET_KEYS: [&'static str; 3] =
        ["strict-legal-auditor", "technical-writer", "onboarding-buddy"];

    #[must_use]
    pub fn custom(prompt: impl Into<String>) -> Self {
        Self::Custom(prompt.into())
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        match self {
            Self::StrictLegalAuditor => STRICT_LEGAL_AUDITOR,
            Self::TechnicalWriter => TECHNICAL_WRITER,
            Self::OnboardingBuddy => ONBOARDING_BUDDY,
            Self::Custom(prompt) => prompt,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::StrictLegalAuditor => "strict-legal-auditor",
            Self::TechnicalWriter => "technical-writer",
            Self::OnboardingBuddy => "onboarding-buddy",
            Self::Custom(_) => "custom",
        }
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "strict-legal-auditor" | "legal" => Ok(Self::StrictLegalAuditor),
            "technical-writer" | "writer" => Ok(Self::TechnicalWriter),
            "onboarding-buddy" | "helpful-onboarding-buddy" | "buddy" => Ok(Self::OnboardingBuddy),
            other => Err(format!(
                "unknown persona '{other}', expected one of: {}",
                Self::PRESET_KEYS.join(", ")
            )),
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
