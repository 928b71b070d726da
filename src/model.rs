//! Model slots and the payloads exchanged with the backend
//!
//! These types don't depend on the terminal UI and are shared by the
//! controller, the HTTP backend and the renderer.

use serde::{Deserialize, Serialize};

/// One of the three answer slots shown side by side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    ChatGpt,
    Gemini,
    Claude,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::ChatGpt => "chatgpt",
            Model::Gemini => "gemini",
            Model::Claude => "claude",
        }
    }

    pub fn all() -> [Model; 3] {
        [Model::ChatGpt, Model::Gemini, Model::Claude]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Model::ChatGpt => "ChatGPT",
            Model::Gemini => "Gemini",
            Model::Claude => "Claude",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Model::ChatGpt => 0,
            Model::Gemini => 1,
            Model::Claude => 2,
        }
    }
}

/// Body of `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
}

/// The three answers. Sent back verbatim as the body of `POST /compare`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelResponses {
    pub chatgpt: String,
    pub gemini: String,
    pub claude: String,
}

impl ModelResponses {
    pub fn get(&self, model: Model) -> &str {
        match model {
            Model::ChatGpt => &self.chatgpt,
            Model::Gemini => &self.gemini,
            Model::Claude => &self.claude,
        }
    }
}

/// One analysis entry of a `/compare` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub model: String,
    pub text: String,
}

/// Analyses in the order the server listed them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonResult {
    pub entries: Vec<Analysis>,
}

/// A response pane: editable answer text plus its time label
#[derive(Debug, Clone, Default)]
pub struct ResponseSlot {
    pub text: String,
    pub time_label: Option<String>,
    pub scroll: u16,
    /// Wrapped rows at the last drawn width
    pub rows: u16,
    /// Rows visible inside the pane borders
    pub viewport: u16,
}

impl ResponseSlot {
    pub fn max_scroll(&self) -> u16 {
        self.rows.saturating_sub(self.viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_indexed_in_display_order() {
        let names: Vec<&str> = Model::all().iter().map(|m| m.display_name()).collect();
        assert_eq!(names, vec!["ChatGPT", "Gemini", "Claude"]);
        for (i, model) in Model::all().iter().enumerate() {
            assert_eq!(model.index(), i);
        }
    }

    #[test]
    fn compare_body_uses_lowercase_keys() {
        let responses = ModelResponses {
            chatgpt: "a".into(),
            gemini: "b".into(),
            claude: "c".into(),
        };
        let json = serde_json::to_string(&responses).unwrap();
        assert_eq!(json, r#"{"chatgpt":"a","gemini":"b","claude":"c"}"#);
        assert_eq!(responses.get(Model::Gemini), "b");
    }
}
