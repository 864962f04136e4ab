use serde_json::json;
use tracing::{debug, warn};

use crate::api::{AncestorRef, NewContent, NewContentType, SpaceRef, StorageBody, TargetApi};
use crate::error::ItemError;
use crate::hierarchy::IdMapping;
use crate::model::{ContentItem, ContentKind, FallbackMarker};

pub const FALLBACK_TITLE_MARKER: &str = "[MIGRATED-FOLDER] ";
pub const ORIGIN_PROPERTY_KEY: &str = "migration-origin";

#[derive(Debug, Clone, Default)]
pub struct CreationContext {
    pub target_space_key: String,
    /// Prepended to every created page and folder title.
    pub title_prefix: String,
}

impl CreationContext {
    pub fn new(target_space_key: &str) -> Self {
        Self {
            target_space_key: target_space_key.to_string(),
            title_prefix: String::new(),
        }
    }

    fn title_for(&self, item: &ContentItem) -> String {
        format!("{}{}", self.title_prefix, item.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentResolution {
    Mapped { source_id: String, target_id: String },
    /// Parent exists in the source but has no target counterpart.
    OutOfScope { source_id: String },
    Root,
}

impl ParentResolution {
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::Mapped { target_id, .. } => Some(target_id),
            Self::OutOfScope { .. } | Self::Root => None,
        }
    }
}

pub fn resolve_parent(item: &ContentItem, mapping: &IdMapping) -> ParentResolution {
    let Some(parent_id) = item.parent_id() else {
        return ParentResolution::Root;
    };
    match mapping.resolve(parent_id) {
        Some(mapped) => ParentResolution::Mapped {
            source_id: parent_id.to_string(),
            target_id: mapped.target_id.clone(),
        },
        None => ParentResolution::OutOfScope {
            source_id: parent_id.to_string(),
        },
    }
}

impl ContentKind {
    /// Creation payload for the item's own type.
    pub fn primary_payload(
        self,
        item: &ContentItem,
        parent_target_id: Option<&str>,
        context: &CreationContext,
    ) -> Result<NewContent, ItemError> {
        if item.title.trim().is_empty() {
            return Err(ItemError::Validation(format!(
                "{} {} has an empty title",
                self, item.id
            )));
        }
        let (content_type, body) = match self {
            Self::Page => {
                let body = item.body.as_deref().ok_or_else(|| {
                    ItemError::Validation(format!("page {} has no storage body", item.id))
                })?;
                (NewContentType::Page, Some(StorageBody::storage(body)))
            }
            Self::Folder => (NewContentType::Folder, None),
        };
        Ok(NewContent {
            content_type,
            title: Some(context.title_for(item)),
            space: Some(SpaceRef {
                key: context.target_space_key.clone(),
            }),
            container: None,
            ancestors: ancestors_for(parent_target_id),
            body,
            metadata: None,
        })
    }

    /// Substitute payload used when the primary creation fails. Pages have none.
    pub fn fallback_payload(
        self,
        item: &ContentItem,
        parent_target_id: Option<&str>,
        context: &CreationContext,
    ) -> Option<NewContent> {
        match self {
            Self::Page => None,
            Self::Folder => Some(NewContent {
                content_type: NewContentType::Page,
                title: Some(format!(
                    "{}{FALLBACK_TITLE_MARKER}{}",
                    context.title_prefix, item.title
                )),
                space: Some(SpaceRef {
                    key: context.target_space_key.clone(),
                }),
                container: None,
                ancestors: ancestors_for(parent_target_id),
                body: Some(StorageBody::storage(&placeholder_body(&item.title))),
                metadata: Some(json!({
                    "properties": {
                        ORIGIN_PROPERTY_KEY: {
                            "key": ORIGIN_PROPERTY_KEY,
                            "value": {
                                "originalType": ContentKind::Folder.as_str(),
                                "fallback": true
                            }
                        }
                    }
                })),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedItem {
    pub target_id: String,
    pub parent_target_id: Option<String>,
    pub fallback: Option<FallbackMarker>,
}

/// Create one item in the target under its mapped parent.
///
/// An unmapped parent degrades to a root-level item. A folder whose creation
/// call failed is retried once as a placeholder page. A failed page, or a
/// folder whose success response could not be decoded, is returned as is.
pub fn create_item<T: TargetApi>(
    target: &mut T,
    item: &ContentItem,
    mapping: &IdMapping,
    context: &CreationContext,
) -> Result<CreatedItem, ItemError> {
    let parent = resolve_parent(item, mapping);
    if let ParentResolution::OutOfScope { source_id } = &parent {
        debug!(
            source_id = %item.id,
            parent_id = %source_id,
            "parent was not migrated, creating at space root"
        );
    }
    let parent_target_id = parent.target_id();

    let payload = item.kind.primary_payload(item, parent_target_id, context)?;
    let primary_error = match target.create_content(&payload) {
        Ok(created) => {
            return Ok(CreatedItem {
                target_id: created.id,
                parent_target_id: parent_target_id.map(str::to_string),
                fallback: None,
            });
        }
        Err(error) if !error.is_call_failure() => return Err(ItemError::from(error)),
        Err(error) => ItemError::from(error),
    };

    let Some(fallback) = item.kind.fallback_payload(item, parent_target_id, context) else {
        return Err(primary_error);
    };
    warn!(
        source_id = %item.id,
        title = %item.title,
        status = ?primary_error.status(),
        "{} creation failed, retrying as placeholder page: {primary_error}",
        item.kind
    );

    match target.create_content(&fallback) {
        Ok(created) => Ok(CreatedItem {
            target_id: created.id,
            parent_target_id: parent_target_id.map(str::to_string),
            fallback: Some(FallbackMarker::synthetic_folder()),
        }),
        Err(error) => Err(ItemError::FallbackExhausted {
            folder: Box::new(primary_error),
            fallback: Box::new(ItemError::from(error)),
        }),
    }
}

fn ancestors_for(parent_target_id: Option<&str>) -> Vec<AncestorRef> {
    parent_target_id
        .map(|id| vec![AncestorRef { id: id.to_string() }])
        .unwrap_or_default()
}

fn placeholder_body(folder_title: &str) -> String {
    format!(
        "<p><strong>This was originally a folder: {}</strong></p><p>Content from the original folder has been migrated below.</p>",
        escape_html(folder_title)
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
