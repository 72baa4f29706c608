use std::path::{Path, PathBuf};

use {
    serde::{Deserialize, Serialize},
    snaplist_config::{config_dir, load_document, save_document},
};

use crate::request::{Condition, ListingDraft};

/// Values pre-filled into a new listing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingDefaults {
    pub category_id: String,
    pub condition: Condition,
    pub quantity: u32,
}

impl Default for ListingDefaults {
    fn default() -> Self {
        Self {
            category_id: String::new(),
            condition: Condition::New,
            quantity: 1,
        }
    }
}

impl ListingDefaults {
    /// Fill the draft's blank category, condition and quantity.
    pub fn apply_to(&self, draft: &mut ListingDraft) {
        if draft.category_id.trim().is_empty() {
            draft.category_id = self.category_id.clone();
        }
        if draft.condition.trim().is_empty() {
            draft.condition = self.condition.as_str().to_string();
        }
        if draft.quantity.trim().is_empty() {
            draft.quantity = self.quantity.max(1).to_string();
        }
    }
}

/// Listing defaults at `~/.config/snaplist/defaults.json`.
#[derive(Debug, Clone)]
pub struct DefaultsStore {
    path: PathBuf,
}

impl DefaultsStore {
    pub fn new() -> Self {
        Self {
            path: config_dir().join("defaults.json"),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> ListingDefaults {
        load_document(&self.path)
    }

    /// Persist `defaults`; a zero quantity is stored as 1.
    pub fn save(&self, defaults: &ListingDefaults) -> anyhow::Result<()> {
        let mut defaults = defaults.clone();
        defaults.quantity = defaults.quantity.max(1);
        save_document(&self.path, &defaults)
    }
}

impl Default for DefaultsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_read_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = DefaultsStore::with_path(dir.path().join("defaults.json"));
        assert_eq!(store.load(), ListingDefaults {
            category_id: String::new(),
            condition: Condition::New,
            quantity: 1,
        });
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = DefaultsStore::with_path(dir.path().join("defaults.json"));
        let defaults = ListingDefaults {
            category_id: "183454".into(),
            condition: Condition::UsedExcellent,
            quantity: 3,
        };
        store.save(&defaults).unwrap();
        assert_eq!(store.load(), defaults);
    }

    #[test]
    fn zero_quantity_saved_as_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = DefaultsStore::with_path(dir.path().join("defaults.json"));
        store
            .save(&ListingDefaults {
                quantity: 0,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(store.load().quantity, 1);
    }

    #[test]
    fn defaults_fill_only_blank_fields() {
        let defaults = ListingDefaults {
            category_id: "261328".into(),
            condition: Condition::UsedGood,
            quantity: 4,
        };

        let mut blank = ListingDraft::default();
        defaults.apply_to(&mut blank);
        assert_eq!(blank.category_id, "261328");
        assert_eq!(blank.condition, "USED_GOOD");
        assert_eq!(blank.quantity, "4");

        let mut filled = ListingDraft {
            category_id: "183454".into(),
            condition: "NEW".into(),
            quantity: "1".into(),
            ..Default::default()
        };
        defaults.apply_to(&mut filled);
        assert_eq!(filled.category_id, "183454");
        assert_eq!(filled.condition, "NEW");
        assert_eq!(filled.quantity, "1");
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        std::fs::write(&path, r#"{"category_id":"261328"}"#).unwrap();
        let defaults = DefaultsStore::with_path(path).load();
        assert_eq!(defaults.category_id, "261328");
        assert_eq!(defaults.condition, Condition::New);
        assert_eq!(defaults.quantity, 1);
    }
}
