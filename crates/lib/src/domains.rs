//! # Domain Profiles
//!
//! A domain selects the vocabulary used to read a document: the prompts sent to
//! the model, the categories a record can be filed under and the statuses a
//! metric may carry. The set of domains is closed and the profiles are static.

use crate::{
    errors::ExtractError,
    prompts::{
        core::{IMAGE_USER_INSTRUCTION, RECORD_OUTPUT_CONTRACT},
        finance::{FINANCE_CATEGORIES, FINANCE_IMAGE_PROMPT, FINANCE_STATUSES, FINANCE_TEXT_PROMPT},
        health::{HEALTH_CATEGORIES, HEALTH_IMAGE_PROMPT, HEALTH_STATUSES, HEALTH_TEXT_PROMPT},
    },
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// The kind of document being extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Health,
    Finance,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Health, Domain::Finance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Health => "health",
            Domain::Finance => "finance",
        }
    }

    /// Returns the static profile for this domain.
    pub fn profile(self) -> &'static DomainProfile {
        match self {
            Domain::Health => &HEALTH_PROFILE,
            Domain::Finance => &FINANCE_PROFILE,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "health" => Ok(Domain::Health),
            "finance" => Ok(Domain::Finance),
            other => Err(ExtractError::Configuration(format!(
                "unsupported domain: '{other}'"
            ))),
        }
    }
}

impl Serialize for Domain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Domain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Extraction instructions and vocabulary for one domain.
#[derive(Debug)]
pub struct DomainProfile {
    pub domain: Domain,
    pub image_prompt: &'static str,
    pub text_prompt: &'static str,
    pub allowed_categories: &'static [&'static str],
    pub statuses: &'static [&'static str],
}

static HEALTH_PROFILE: DomainProfile = DomainProfile {
    domain: Domain::Health,
    image_prompt: HEALTH_IMAGE_PROMPT,
    text_prompt: HEALTH_TEXT_PROMPT,
    allowed_categories: HEALTH_CATEGORIES,
    statuses: HEALTH_STATUSES,
};

static FINANCE_PROFILE: DomainProfile = DomainProfile {
    domain: Domain::Finance,
    image_prompt: FINANCE_IMAGE_PROMPT,
    text_prompt: FINANCE_TEXT_PROMPT,
    allowed_categories: FINANCE_CATEGORIES,
    statuses: FINANCE_STATUSES,
};

impl DomainProfile {
    /// Whether `status` is one of this domain's metric statuses.
    pub fn accepts_status(&self, status: &str) -> bool {
        self.statuses.contains(&status)
    }

    /// Whether `category` is one of the advisory categories.
    pub fn is_known_category(&self, category: &str) -> bool {
        self.allowed_categories.contains(&category)
    }

    /// The full system prompt for image input.
    pub fn image_system_prompt(&self) -> String {
        self.with_output_contract(self.image_prompt)
    }

    /// The full system prompt for text input.
    pub fn text_system_prompt(&self) -> String {
        self.with_output_contract(self.text_prompt)
    }

    /// The user-side instruction sent alongside an image.
    pub fn image_instruction(&self) -> String {
        IMAGE_USER_INSTRUCTION.replace("{domain}", self.domain.as_str())
    }

    fn with_output_contract(&self, prompt: &str) -> String {
        let contract = RECORD_OUTPUT_CONTRACT
            .replace("{domain}", self.domain.as_str())
            .replace("{statuses}", &quoted_list(self.statuses))
            .replace("{categories}", &quoted_list(self.allowed_categories));
        format!("{prompt}\n\n{contract}")
    }
}

fn quoted_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
