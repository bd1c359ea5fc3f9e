use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::projection::project;
use crate::{DroppedFile, FileCategory};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    /// Upload timestamp, compared as its ISO-8601 string.
    #[default]
    Date,
    /// Derived extension.
    Type,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "date" => Ok(SortKey::Date),
            "type" => Ok(SortKey::Type),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Name => "name",
            SortKey::Date => "date",
            SortKey::Type => "type",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Search, type filter and sort state of one catalog view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ViewState {
    query: String,
    selected_extensions: BTreeSet<String>,
    sort_key: SortKey,
    sort_direction: SortDirection,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_extensions(&self) -> &BTreeSet<String> {
        &self.selected_extensions
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Picking the active key flips the direction; a new key starts descending.
    pub fn select_sort(&mut self, key: SortKey) {
        if self.sort_key == key {
            self.sort_direction = self.sort_direction.reversed();
        } else {
            self.sort_key = key;
            self.sort_direction = SortDirection::Desc;
        }
    }

    pub fn set_sort(&mut self, key: SortKey, direction: SortDirection) {
        self.sort_key = key;
        self.sort_direction = direction;
    }

    /// Selects every extension of `category`, or clears them all if they were all selected already.
    pub fn toggle_category(&mut self, category: FileCategory) {
        if self.is_category_selected(category) {
            for ext in category.extensions() {
                self.selected_extensions.remove(*ext);
            }
        } else {
            self.selected_extensions
                .extend(category.extensions().iter().map(|ext| ext.to_string()));
        }
    }

    pub fn is_category_selected(&self, category: FileCategory) -> bool {
        category
            .extensions()
            .iter()
            .all(|ext| self.selected_extensions.contains(*ext))
    }

    /// Accepts `md`, `.md` or `.MD`.
    pub fn select_extension(&mut self, extension: &str) {
        self.selected_extensions.insert(normalize_extension(extension));
    }

    pub fn deselect_extension(&mut self, extension: &str) {
        self.selected_extensions.remove(&normalize_extension(extension));
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn apply(&self, files: &[DroppedFile]) -> Vec<DroppedFile> {
        project(
            files,
            &self.query,
            &self.selected_extensions,
            self.sort_key,
            self.sort_direction,
        )
    }
}

fn normalize_extension(extension: &str) -> String {
    let lowered = extension.to_lowercase();
    if lowered.starts_with('.') {
        lowered
    } else {
        format!(".{}", lowered)
    }
}
