//! In-memory source and target used by the unit tests.

use std::collections::BTreeMap;

use crate::api::{
    AttachmentUpload, CreatedContent, CreatedLabel, CreatedSpace, NewContent, NewContentType,
    NewLabel, NewSpace, SourceApi, SourceAttachment, SourceComment, SourceLabel, TargetApi,
};
use crate::error::ApiError;
use crate::model::{ContentItem, ContentKind, SpaceInfo};

pub(crate) fn item(id: &str, kind: ContentKind, title: &str, ancestors: &[&str]) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        kind,
        title: title.to_string(),
        ancestors: ancestors.iter().map(|id| (*id).to_string()).collect(),
        body: None,
        space_key: "SRC".to_string(),
    }
}

/// In-memory source used across the crate's tests.
#[derive(Default)]
pub(crate) struct MockSource {
    pub space: Option<SpaceInfo>,
    pub items: Vec<ContentItem>,
    pub fail_pages: bool,
    pub fail_query: bool,
    pub fail_full_listing: bool,
    pub fail_detail: Vec<String>,
    pub attachments: BTreeMap<String, Vec<SourceAttachment>>,
    pub comments: BTreeMap<String, Vec<SourceComment>>,
    pub labels: BTreeMap<String, Vec<SourceLabel>>,
    pub fail_attachment_listing: Vec<String>,
    pub fail_comment_listing: Vec<String>,
    pub fail_label_listing: Vec<String>,
    pub fail_download: Vec<String>,
    pub detail_requests: Vec<String>,
    pub requests: usize,
}

impl MockSource {
    pub(crate) fn with_space(name: &str) -> Self {
        Self {
            space: Some(SpaceInfo {
                id: "1".to_string(),
                key: "SRC".to_string(),
                name: name.to_string(),
                description: "source space".to_string(),
                space_type: Some("global".to_string()),
                url: None,
            }),
            ..Self::default()
        }
    }

    fn unavailable() -> ApiError {
        ApiError::Status {
            status: 500,
            body: "unavailable".to_string(),
        }
    }
}

impl SourceApi for MockSource {
    fn list_spaces(&mut self) -> Result<Vec<SpaceInfo>, ApiError> {
        self.requests += 1;
        Ok(self.space.iter().cloned().collect())
    }

    fn get_space(&mut self, space_key: &str) -> Result<SpaceInfo, ApiError> {
        self.requests += 1;
        self.space
            .clone()
            .filter(|space| space.key == space_key)
            .ok_or(ApiError::Status {
                status: 404,
                body: format!("no space {space_key}"),
            })
    }

    fn list_content(
        &mut self,
        _space_key: &str,
        content_type: Option<&str>,
    ) -> Result<Vec<ContentItem>, ApiError> {
        self.requests += 1;
        match content_type {
            Some(_) if self.fail_pages => return Err(Self::unavailable()),
            None if self.fail_full_listing => return Err(Self::unavailable()),
            _ => {}
        }
        Ok(self
            .items
            .iter()
            .filter(|item| content_type.is_none_or(|kind| item.kind.as_str() == kind))
            .cloned()
            .collect())
    }

    fn query_content(&mut self, _cql: &str) -> Result<Vec<ContentItem>, ApiError> {
        self.requests += 1;
        if self.fail_query {
            return Err(ApiError::Status {
                status: 400,
                body: "unsupported query".to_string(),
            });
        }
        Ok(self
            .items
            .iter()
            .filter(|item| item.kind == ContentKind::Folder)
            .cloned()
            .collect())
    }

    fn get_content(&mut self, content_id: &str) -> Result<ContentItem, ApiError> {
        self.requests += 1;
        self.detail_requests.push(content_id.to_string());
        if self.fail_detail.iter().any(|id| id == content_id) {
            return Err(ApiError::Timeout { timeout_ms: 30_000 });
        }
        let mut item = self
            .items
            .iter()
            .find(|item| item.id == content_id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                body: format!("no content {content_id}"),
            })?;
        if item.kind == ContentKind::Page && item.body.is_none() {
            item.body = Some(format!("<p>{}</p>", item.title));
        }
        Ok(item)
    }

    fn list_attachments(&mut self, page_id: &str) -> Result<Vec<SourceAttachment>, ApiError> {
        self.requests += 1;
        if self.fail_attachment_listing.iter().any(|id| id == page_id) {
            return Err(Self::unavailable());
        }
        Ok(self.attachments.get(page_id).cloned().unwrap_or_default())
    }

    fn list_comments(&mut self, page_id: &str) -> Result<Vec<SourceComment>, ApiError> {
        self.requests += 1;
        if self.fail_comment_listing.iter().any(|id| id == page_id) {
            return Err(Self::unavailable());
        }
        Ok(self.comments.get(page_id).cloned().unwrap_or_default())
    }

    fn list_labels(&mut self, page_id: &str) -> Result<Vec<SourceLabel>, ApiError> {
        self.requests += 1;
        if self.fail_label_listing.iter().any(|id| id == page_id) {
            return Err(Self::unavailable());
        }
        Ok(self.labels.get(page_id).cloned().unwrap_or_default())
    }

    fn download_attachment(
        &mut self,
        attachment: &SourceAttachment,
    ) -> Result<Vec<u8>, ApiError> {
        self.requests += 1;
        if self.fail_download.contains(&attachment.id) {
            return Err(ApiError::Status {
                status: 404,
                body: "gone".to_string(),
            });
        }
        Ok(attachment.title.as_bytes().to_vec())
    }

    fn request_count(&self) -> usize {
        self.requests
    }
}

/// In-memory target. Ids are handed out sequentially from 1000.
#[derive(Default)]
pub(crate) struct MockTarget {
    pub space_error: Option<ApiError>,
    pub folder_error: Option<ApiError>,
    pub fallback_error: Option<ApiError>,
    pub title_errors: BTreeMap<String, ApiError>,
    pub comment_error: Option<ApiError>,
    pub upload_errors: BTreeMap<String, ApiError>,
    pub label_error: Option<ApiError>,
    /// Label names the target silently drops.
    pub ignored_labels: Vec<String>,
    pub spaces: Vec<NewSpace>,
    pub attempts: Vec<NewContent>,
    pub created: Vec<(String, NewContent)>,
    pub uploads: Vec<(String, AttachmentUpload)>,
    pub labels: Vec<(String, Vec<NewLabel>)>,
    pub next_id: usize,
}

impl MockTarget {
    fn allocate_id(&mut self) -> String {
        let id = format!("{}", 1000 + self.next_id);
        self.next_id += 1;
        id
    }

    /// Target id assigned to the created content with `title`.
    pub(crate) fn id_of(&self, title: &str) -> Option<&str> {
        self.created
            .iter()
            .find(|(_, content)| content.title.as_deref() == Some(title))
            .map(|(id, _)| id.as_str())
    }

    pub(crate) fn content_titled(&self, title: &str) -> Option<&NewContent> {
        self.created
            .iter()
            .map(|(_, content)| content)
            .find(|content| content.title.as_deref() == Some(title))
    }

    pub(crate) fn comments(&self) -> Vec<&NewContent> {
        self.created
            .iter()
            .map(|(_, content)| content)
            .filter(|content| content.content_type == NewContentType::Comment)
            .collect()
    }
}

impl TargetApi for MockTarget {
    fn create_space(&mut self, space: &NewSpace) -> Result<CreatedSpace, ApiError> {
        self.spaces.push(space.clone());
        if let Some(error) = &self.space_error {
            return Err(error.clone());
        }
        Ok(CreatedSpace {
            id: self.allocate_id(),
            key: space.key.clone(),
            name: space.name.clone(),
        })
    }

    fn create_content(&mut self, content: &NewContent) -> Result<CreatedContent, ApiError> {
        self.attempts.push(content.clone());
        let title = content.title.clone().unwrap_or_default();
        let error = match content.content_type {
            NewContentType::Folder => self.folder_error.clone(),
            NewContentType::Page if content.metadata.is_some() => self.fallback_error.clone(),
            NewContentType::Comment => self.comment_error.clone(),
            NewContentType::Page => None,
        }
        .or_else(|| self.title_errors.get(&title).cloned());
        if let Some(error) = error {
            return Err(error);
        }

        let id = self.allocate_id();
        self.created.push((id.clone(), content.clone()));
        Ok(CreatedContent { id })
    }

    fn upload_attachment(
        &mut self,
        page_id: &str,
        upload: &AttachmentUpload,
    ) -> Result<CreatedContent, ApiError> {
        if let Some(error) = self.upload_errors.get(&upload.file_name) {
            return Err(error.clone());
        }
        self.uploads.push((page_id.to_string(), upload.clone()));
        Ok(CreatedContent {
            id: self.allocate_id(),
        })
    }

    fn add_labels(
        &mut self,
        page_id: &str,
        labels: &[NewLabel],
    ) -> Result<Vec<CreatedLabel>, ApiError> {
        if let Some(error) = &self.label_error {
            return Err(error.clone());
        }
        self.labels.push((page_id.to_string(), labels.to_vec()));
        let applied: Vec<NewLabel> = labels
            .iter()
            .filter(|label| !self.ignored_labels.contains(&label.name))
            .cloned()
            .collect();
        Ok(applied
            .into_iter()
            .map(|label| CreatedLabel {
                id: self.allocate_id(),
                name: label.name,
            })
            .collect())
    }

    fn request_count(&self) -> usize {
        self.spaces.len() + self.attempts.len() + self.uploads.len() + self.labels.len()
    }
}
