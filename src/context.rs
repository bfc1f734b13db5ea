use serde::{Deserialize, Serialize};

/// Who a result belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
}

impl Identity {
    /// Derive an identity from a display name; the id is the trimmed, lowercased name.
    /// Returns None for blank names.
    pub fn from_name(name: &str) -> Option<Self> {
        let display_name = name.trim();
        if display_name.is_empty() {
            return None;
        }
        Some(Self {
            id: display_name.to_lowercase(),
            display_name: display_name.to_string(),
        })
    }
}

/// Explicit context handed to the controller and UI at construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppContext {
    pub identity: Option<Identity>,
    pub dark_mode: bool,
    pub music_enabled: bool,
}

impl AppContext {
    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }
}
