//! Source and target collaborator contracts.
//!
//! Every write goes through the v1 content contract: spaces are referenced by
//! key and parent linkage is an `ancestors` list.

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::model::{ContentItem, SpaceInfo};

pub trait SourceApi {
    fn list_spaces(&mut self) -> Result<Vec<SpaceInfo>, ApiError>;
    fn get_space(&mut self, space_key: &str) -> Result<SpaceInfo, ApiError>;
    /// Paginated listing with ancestors expanded. `content_type` of `None`
    /// lists every type; items of unsupported types are dropped.
    fn list_content(
        &mut self,
        space_key: &str,
        content_type: Option<&str>,
    ) -> Result<Vec<ContentItem>, ApiError>;
    /// Filter-expression query with ancestors expanded.
    fn query_content(&mut self, cql: &str) -> Result<Vec<ContentItem>, ApiError>;
    /// One item with body, ancestors and space expanded.
    fn get_content(&mut self, content_id: &str) -> Result<ContentItem, ApiError>;
    fn list_attachments(&mut self, page_id: &str) -> Result<Vec<SourceAttachment>, ApiError>;
    fn list_comments(&mut self, page_id: &str) -> Result<Vec<SourceComment>, ApiError>;
    fn list_labels(&mut self, page_id: &str) -> Result<Vec<SourceLabel>, ApiError>;
    fn download_attachment(&mut self, attachment: &SourceAttachment) -> Result<Vec<u8>, ApiError>;
    fn request_count(&self) -> usize;
}

pub trait TargetApi {
    fn create_space(&mut self, space: &NewSpace) -> Result<CreatedSpace, ApiError>;
    fn create_content(&mut self, content: &NewContent) -> Result<CreatedContent, ApiError>;
    fn upload_attachment(
        &mut self,
        page_id: &str,
        upload: &AttachmentUpload,
    ) -> Result<CreatedContent, ApiError>;
    /// Attach labels to a page in one call; returns the labels now on the page.
    fn add_labels(
        &mut self,
        page_id: &str,
        labels: &[NewLabel],
    ) -> Result<Vec<CreatedLabel>, ApiError>;
    fn request_count(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAttachment {
    pub id: String,
    pub title: String,
    pub media_type: Option<String>,
    /// Download link as returned by the source, usually relative to its base URL.
    pub download_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceComment {
    pub id: String,
    pub body: String,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLabel {
    pub id: String,
    pub prefix: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSpace {
    pub key: String,
    pub name: String,
    pub description: SpaceDescription,
}

impl NewSpace {
    pub fn new(key: &str, name: &str, description: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: SpaceDescription {
                plain: PlainValue {
                    value: description.to_string(),
                    representation: "plain".to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceDescription {
    pub plain: PlainValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainValue {
    pub value: String,
    pub representation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSpace {
    pub id: String,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NewContentType {
    Page,
    Folder,
    Comment,
}

/// Request body for `POST /content`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewContent {
    #[serde(rename = "type")]
    pub content_type: NewContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space: Option<SpaceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<AncestorRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<StorageBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl NewContent {
    pub fn comment(container_id: &str, body: &str) -> Self {
        Self {
            content_type: NewContentType::Comment,
            title: None,
            space: None,
            container: Some(ContainerRef {
                id: container_id.to_string(),
                container_type: "page".to_string(),
            }),
            ancestors: Vec::new(),
            body: Some(StorageBody::storage(body)),
            metadata: None,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.ancestors.last().map(|ancestor| ancestor.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceRef {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerRef {
    pub id: String,
    #[serde(rename = "type")]
    pub container_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageBody {
    pub storage: StorageValue,
}

impl StorageBody {
    pub fn storage(value: &str) -> Self {
        Self {
            storage: StorageValue {
                value: value.to_string(),
                representation: "storage".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageValue {
    pub value: String,
    pub representation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedContent {
    pub id: String,
}

/// Request body entry for `POST /content/{id}/label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLabel {
    pub prefix: String,
    pub name: String,
}

impl From<&SourceLabel> for NewLabel {
    fn from(label: &SourceLabel) -> Self {
        Self {
            prefix: label.prefix.clone(),
            name: label.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLabel {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_payload_targets_container() {
        let payload = serde_json::to_value(NewContent::comment("555", "<p>hi</p>")).expect("json");
        assert_eq!(payload["type"], "comment");
        assert_eq!(payload["container"]["id"], "555");
        assert_eq!(payload["container"]["type"], "page");
        assert_eq!(payload["body"]["storage"]["value"], "<p>hi</p>");
        assert_eq!(payload["body"]["storage"]["representation"], "storage");
        assert!(payload.get("ancestors").is_none());
        assert!(payload.get("space").is_none());
    }

    #[test]
    fn new_space_uses_plain_description() {
        let payload = serde_json::to_value(NewSpace::new("DST", "Docs", "copied")).expect("json");
        assert_eq!(payload["key"], "DST");
        assert_eq!(payload["description"]["plain"]["value"], "copied");
        assert_eq!(payload["description"]["plain"]["representation"], "plain");
    }

    #[test]
    fn label_payload_keeps_prefix_and_name() {
        let source = SourceLabel {
            id: "77".to_string(),
            prefix: "global".to_string(),
            name: "runbook".to_string(),
        };
        let payload = serde_json::to_value(vec![NewLabel::from(&source)]).expect("json");
        assert_eq!(payload, serde_json::json!([{"prefix": "global", "name": "runbook"}]));
    }
}
