// Display languages supported by the lookup commands.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Fr, Language::En];

    /// Language code as used by the translation oracle.
    pub fn code(self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Chat command answering in this language.
    pub fn command_name(self) -> &'static str {
        match self {
            Language::Fr => "where",
            Language::En => "where_en",
        }
    }

    pub fn from_command(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.command_name() == name)
    }

    pub fn command_description(self) -> &'static str {
        match self {
            Language::Fr => "Affiche les conditions de spawn d'un Pokémon",
            Language::En => "Show the spawn conditions of a Pokémon",
        }
    }

    /// Prefix on every message after the first of a multi-part answer.
    pub fn continuation_prefix(self) -> &'static str {
        match self {
            Language::Fr => "(suite) ",
            Language::En => "(cont.) ",
        }
    }

    pub fn header(self, name: &str) -> String {
        match self {
            Language::Fr => format!("🔍 **Informations sur {name}**"),
            Language::En => format!("🔍 **Spawn information for {name}**"),
        }
    }

    pub fn not_found(self, name: &str) -> String {
        match self {
            Language::Fr => format!("❌ Aucune information trouvée pour **{name}**."),
            Language::En => format!("❌ No information found for **{name}**."),
        }
    }
}
