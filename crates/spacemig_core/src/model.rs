use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ItemError;

/// The two content types the migration engine knows how to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Page,
    Folder,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Folder => "folder",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "page" => Some(Self::Page),
            "folder" => Some(Self::Folder),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of one source item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub title: String,
    /// Root-first ancestor ids; the last entry is the immediate parent.
    pub ancestors: Vec<String>,
    pub body: Option<String>,
    pub space_key: String,
}

impl ContentItem {
    pub fn parent_id(&self) -> Option<&str> {
        self.ancestors.last().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    pub fn is_root(&self) -> bool {
        self.ancestors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceInfo {
    pub id: String,
    pub key: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub space_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Marker carried by items that were created through the folder fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackMarker {
    pub original_type: ContentKind,
    pub fallback: bool,
}

impl FallbackMarker {
    pub fn synthetic_folder() -> Self {
        Self {
            original_type: ContentKind::Folder,
            fallback: true,
        }
    }
}

/// Outcome of one attempted item. `target_id` is present iff `success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackMarker>,
}

impl MigrationRecord {
    pub fn succeeded(
        item: &ContentItem,
        target_id: impl Into<String>,
        fallback: Option<FallbackMarker>,
    ) -> Self {
        Self {
            source_id: item.id.clone(),
            target_id: Some(target_id.into()),
            title: item.title.clone(),
            kind: item.kind,
            success: true,
            error: None,
            status: None,
            fallback,
        }
    }

    pub fn failed(item: &ContentItem, error: &ItemError) -> Self {
        Self {
            source_id: item.id.clone(),
            target_id: None,
            title: item.title.clone(),
            kind: item.kind,
            success: false,
            error: Some(error.to_string()),
            status: error.status(),
            fallback: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some_and(|marker| marker.fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubResourceKind {
    Attachment,
    Comment,
    Label,
}

impl SubResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Comment => "comment",
            Self::Label => "label",
        }
    }
}

/// Outcome of one attachment, comment or label replicated under a migrated page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubResourceRecord {
    pub page_source_id: String,
    pub kind: SubResourceKind,
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    pub title: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubResourceRecord {
    pub fn succeeded(
        page_source_id: &str,
        kind: SubResourceKind,
        source_id: &str,
        title: &str,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            page_source_id: page_source_id.to_string(),
            kind,
            source_id: source_id.to_string(),
            target_id: Some(target_id.into()),
            title: title.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failed(
        page_source_id: &str,
        kind: SubResourceKind,
        source_id: &str,
        title: &str,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            page_source_id: page_source_id.to_string(),
            kind,
            source_id: source_id.to_string(),
            target_id: None,
            title: title.to_string(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}
