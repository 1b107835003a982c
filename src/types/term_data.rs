use serde::{Deserialize, Serialize};

use super::reading_data::TermStatus;

/// What the server's term popup tells us about a term.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TermDetails {
    pub term: String,
    pub translation: String,
    pub romanization: String,
    pub tags: Vec<String>,
    pub parents: Vec<ParentDetails>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ParentDetails {
    pub term: String,
    pub translation: String,
}

/// Editable fields of a term, as shown on the server's edit page.
/// Also the shape of the locally saved draft.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TermForm {
    pub term_id: u64,
    pub text: String,
    pub translation: String,
    pub romanization: String,
    pub status: TermStatus,
    pub parents: Vec<String>,
    pub tags: Vec<String>,
}

impl TermForm {
    /// Form fields in the order the server's edit form posts them.
    pub fn to_form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("text", self.text.clone()),
            ("translation", self.translation.clone()),
            ("romanization", self.romanization.clone()),
            ("status", self.status.code().to_string()),
            ("parentslist", self.parents.join(", ")),
            ("termtagslist", self.tags.join(", ")),
        ]
    }
}

/// An entry of the server's language table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LanguageEntry {
    pub id: u32,
    pub name: String,
}

/// Fields of interest from a book's edit page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct BookInfo {
    pub title: String,
    pub language_id: Option<u32>,
}
