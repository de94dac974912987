//! Voice languages understood by the synthesizer

use log::{debug, warn};
use std::fmt;
use std::str::FromStr;

/// Language tags the pico voices ship with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    EnUs,
    EnGb,
    DeDe,
    EsEs,
    FrFr,
    ItIt,
}

impl Language {
    /// Every supported language, in voice-index order
    pub const ALL: [Language; 6] = [
        Language::EnUs,
        Language::EnGb,
        Language::DeDe,
        Language::EsEs,
        Language::FrFr,
        Language::ItIt,
    ];

    /// The tag passed to the synthesizer (`-l` argument)
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::EnUs => "en-US",
            Language::EnGb => "en-GB",
            Language::DeDe => "de-DE",
            Language::EsEs => "es-ES",
            Language::FrFr => "fr-FR",
            Language::ItIt => "it-IT",
        }
    }

    /// Resolve a requested tag against the supported set
    ///
    /// A missing or empty request silently uses `default`. An unsupported
    /// tag is logged and replaced by `default`; this never fails.
    pub fn resolve(requested: Option<&str>, default: Language) -> Language {
        let requested = requested.map(str::trim).filter(|s| !s.is_empty());

        match requested {
            None => {
                debug!("No language requested, using default {}", default);
                default
            }
            Some(tag) => match tag.parse() {
                Ok(lang) => lang,
                Err(_) => {
                    warn!("Unsupported voice {}. Using default voice {}", tag, default);
                    default
                }
            },
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.as_str() == s)
            .ok_or_else(|| format!("unsupported language: {}", s))
    }
}
