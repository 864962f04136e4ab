use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{
    AttachmentUpload, CreatedContent, CreatedLabel, CreatedSpace, NewContent, NewLabel, NewSpace,
    SourceApi, SourceAttachment, SourceComment, SourceLabel, TargetApi,
};
use crate::config::{InstanceRole, MigratorConfig};
use crate::error::ApiError;
use crate::model::{ContentItem, ContentKind, SpaceInfo};

#[derive(Debug, Clone)]
pub struct ConfluenceClientConfig {
    /// Instance base URL including the context path, e.g. `https://example.net/wiki`.
    pub base_url: String,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub page_size: usize,
}

impl ConfluenceClientConfig {
    pub fn from_config(config: &MigratorConfig, role: InstanceRole) -> Result<Self> {
        let base_url = config.base_url(role).ok_or_else(|| {
            anyhow::anyhow!(
                "{role} base URL is not configured (set [{role}].base_url or {env}_BASE_URL)",
                role = role.as_str(),
                env = role.as_str().to_ascii_uppercase()
            )
        })?;
        Ok(Self {
            base_url,
            username: config.username(role),
            api_token: config.api_token(role),
            user_agent: config.user_agent(),
            timeout_ms: config.timeout_ms(),
            page_size: config.page_size(role),
        })
    }
}

struct RestClient {
    client: Client,
    config: ConfluenceClientConfig,
    request_count: usize,
}

impl RestClient {
    fn new(config: ConfluenceClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build content API HTTP client")?;
        Ok(Self {
            client,
            config,
            request_count: 0,
        })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/api{}", self.config.base_url, path)
    }

    fn execute(&mut self, request: RequestBuilder) -> Result<Response, ApiError> {
        self.request_count += 1;
        let request = match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.api_token.as_deref()),
            None => request,
        };
        let response = request.send().map_err(|error| self.transport_error(error))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(
        &mut self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request = self
            .client
            .get(self.rest_url(path))
            .header(ACCEPT, "application/json")
            .query(query);
        let response = self.execute(request)?;
        self.decode(response)
    }

    fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &mut self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self
            .client
            .post(self.rest_url(path))
            .header(ACCEPT, "application/json")
            .json(body);
        let response = self.execute(request)?;
        self.decode(response)
    }

    /// Follow `start`/`limit` pagination until `next_page` says to stop.
    fn get_paged<T: DeserializeOwned>(
        &mut self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        let limit = self.config.page_size.max(1);
        let mut start = 0usize;
        let mut previous: Vec<Value> = Vec::new();
        let mut output = Vec::new();

        loop {
            let mut params = query.to_vec();
            params.push(("start", start.to_string()));
            params.push(("limit", limit.to_string()));

            let page: PagedResponse<Value> = self.get_json(path, &params)?;
            let step = next_page(&PageProgress {
                requested_start: start,
                echoed_start: page.start,
                received: page.results.len(),
                limit,
                has_next: page.links.as_ref().is_some_and(|links| links.next.is_some()),
                repeats_previous: start > 0 && page.results == previous,
            });
            if step == PageStep::Replayed {
                warn!(path, start, "server ignored the page offset, stopping pagination");
                break;
            }
            for row in &page.results {
                let row =
                    T::deserialize(row).map_err(|error| ApiError::Decode(error.to_string()))?;
                output.push(row);
            }
            match step {
                PageStep::Continue(next_start) => {
                    start = next_start;
                    previous = page.results;
                }
                PageStep::Last | PageStep::Replayed => break,
            }
        }

        Ok(output)
    }

    fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiError> {
        let bytes = response
            .bytes()
            .map_err(|error| self.transport_error(error))?;
        serde_json::from_slice(&bytes).map_err(|error| ApiError::Decode(error.to_string()))
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }
        } else {
            ApiError::Transport(error.to_string())
        }
    }
}

/// Read-only client for the instance content is migrated from.
pub struct ConfluenceSource {
    rest: RestClient,
}

impl ConfluenceSource {
    pub fn from_config(config: &MigratorConfig) -> Result<Self> {
        Self::new(ConfluenceClientConfig::from_config(
            config,
            InstanceRole::Source,
        )?)
    }

    pub fn new(config: ConfluenceClientConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }
}

impl SourceApi for ConfluenceSource {
    fn list_spaces(&mut self) -> Result<Vec<SpaceInfo>, ApiError> {
        let spaces: Vec<SpaceDto> = self
            .rest
            .get_paged("/space", &[("expand", "description.plain".to_string())])?;
        let base_url = self.rest.config.base_url.clone();
        Ok(spaces
            .into_iter()
            .map(|space| space.into_info(&base_url))
            .collect())
    }

    fn get_space(&mut self, space_key: &str) -> Result<SpaceInfo, ApiError> {
        let space: SpaceDto = self.rest.get_json(
            &format!("/space/{space_key}"),
            &[("expand", "description.plain".to_string())],
        )?;
        Ok(space.into_info(&self.rest.config.base_url))
    }

    fn list_content(
        &mut self,
        space_key: &str,
        content_type: Option<&str>,
    ) -> Result<Vec<ContentItem>, ApiError> {
        let mut query = vec![
            ("spaceKey", space_key.to_string()),
            ("expand", "ancestors".to_string()),
        ];
        if let Some(content_type) = content_type {
            query.push(("type", content_type.to_string()));
        }
        let rows: Vec<ContentDto> = self.rest.get_paged("/content", &query)?;
        Ok(supported_items(rows, space_key))
    }

    fn query_content(&mut self, cql: &str) -> Result<Vec<ContentItem>, ApiError> {
        let rows: Vec<ContentDto> = self.rest.get_paged(
            "/content/search",
            &[
                ("cql", cql.to_string()),
                ("expand", "ancestors,space".to_string()),
            ],
        )?;
        Ok(supported_items(rows, ""))
    }

    fn get_content(&mut self, content_id: &str) -> Result<ContentItem, ApiError> {
        let row: ContentDto = self.rest.get_json(
            &format!("/content/{content_id}"),
            &[("expand", "body.storage,ancestors,space".to_string())],
        )?;
        let content_type = row.content_type.clone();
        row.into_item("").ok_or_else(|| {
            ApiError::Decode(format!(
                "content {content_id} has unsupported type {content_type}"
            ))
        })
    }

    fn list_attachments(&mut self, page_id: &str) -> Result<Vec<SourceAttachment>, ApiError> {
        let rows: Vec<AttachmentDto> = self
            .rest
            .get_paged(&format!("/content/{page_id}/child/attachment"), &[])?;
        Ok(rows.into_iter().map(AttachmentDto::into_attachment).collect())
    }

    fn list_comments(&mut self, page_id: &str) -> Result<Vec<SourceComment>, ApiError> {
        let rows: Vec<CommentDto> = self.rest.get_paged(
            &format!("/content/{page_id}/child/comment"),
            &[("expand", "body.storage,history".to_string())],
        )?;
        Ok(rows.into_iter().map(CommentDto::into_comment).collect())
    }

    fn list_labels(&mut self, page_id: &str) -> Result<Vec<SourceLabel>, ApiError> {
        let rows: Vec<LabelDto> = self
            .rest
            .get_paged(&format!("/content/{page_id}/label"), &[])?;
        Ok(rows.into_iter().map(LabelDto::into_label).collect())
    }

    fn download_attachment(&mut self, attachment: &SourceAttachment) -> Result<Vec<u8>, ApiError> {
        if attachment.download_path.trim().is_empty() {
            return Err(ApiError::Decode(format!(
                "attachment {} has no download link",
                attachment.id
            )));
        }
        let url = resource_url(&self.rest.config.base_url, &attachment.download_path);
        let request = self.rest.client.get(url);
        let response = self.rest.execute(request)?;
        let bytes = response
            .bytes()
            .map_err(|error| self.rest.transport_error(error))?;
        Ok(bytes.to_vec())
    }

    fn request_count(&self) -> usize {
        self.rest.request_count
    }
}

/// Write client for the instance content is migrated into.
pub struct ConfluenceTarget {
    rest: RestClient,
}

impl ConfluenceTarget {
    pub fn from_config(config: &MigratorConfig) -> Result<Self> {
        Self::new(ConfluenceClientConfig::from_config(
            config,
            InstanceRole::Target,
        )?)
    }

    pub fn new(config: ConfluenceClientConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }
}

impl TargetApi for ConfluenceTarget {
    fn create_space(&mut self, space: &NewSpace) -> Result<CreatedSpace, ApiError> {
        let created: SpaceDto = self.rest.post_json("/space", space)?;
        Ok(CreatedSpace {
            id: created.id,
            key: created.key,
            name: created.name,
        })
    }

    fn create_content(&mut self, content: &NewContent) -> Result<CreatedContent, ApiError> {
        let created: CreatedContentDto = self.rest.post_json("/content", content)?;
        Ok(created.into_created())
    }

    fn upload_attachment(
        &mut self,
        page_id: &str,
        upload: &AttachmentUpload,
    ) -> Result<CreatedContent, ApiError> {
        let part = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
        let part = match upload.media_type.as_deref() {
            Some(media_type) => part.mime_str(media_type).map_err(|error| {
                ApiError::Decode(format!("invalid media type {media_type}: {error}"))
            })?,
            None => part,
        };
        let form = Form::new()
            .part("file", part)
            .text("comment", upload.comment.clone());

        let request = self
            .rest
            .client
            .post(
                self.rest
                    .rest_url(&format!("/content/{page_id}/child/attachment")),
            )
            .header(ACCEPT, "application/json")
            .header("X-Atlassian-Token", "no-check")
            .multipart(form);
        let response = self.rest.execute(request)?;
        let created: PagedResponse<CreatedContentDto> = self.rest.decode(response)?;
        created
            .results
            .into_iter()
            .next()
            .map(CreatedContentDto::into_created)
            .ok_or_else(|| {
                ApiError::Decode(format!(
                    "attachment upload to {page_id} returned no attachment"
                ))
            })
    }

    fn add_labels(
        &mut self,
        page_id: &str,
        labels: &[NewLabel],
    ) -> Result<Vec<CreatedLabel>, ApiError> {
        let applied: PagedResponse<LabelDto> = self
            .rest
            .post_json(&format!("/content/{page_id}/label"), labels)?;
        Ok(applied
            .results
            .into_iter()
            .map(|label| CreatedLabel {
                id: label.id,
                name: label.name,
            })
            .collect())
    }

    fn request_count(&self) -> usize {
        self.rest.request_count
    }
}

/// What one fetched page says about the listing.
#[derive(Debug, Clone, Copy)]
struct PageProgress {
    requested_start: usize,
    /// `start` echoed by the server, when it sends one.
    echoed_start: Option<usize>,
    received: usize,
    limit: usize,
    has_next: bool,
    repeats_previous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageStep {
    /// Keep the page and request the next one at this offset.
    Continue(usize),
    /// Keep the page and stop.
    Last,
    /// The server answered with an earlier page; drop it and stop.
    Replayed,
}

fn next_page(progress: &PageProgress) -> PageStep {
    let offset_ignored = progress.requested_start > 0
        && progress
            .echoed_start
            .is_some_and(|echoed| echoed != progress.requested_start);
    if offset_ignored || progress.repeats_previous {
        return PageStep::Replayed;
    }
    if progress.received == 0 || (!progress.has_next && progress.received < progress.limit) {
        return PageStep::Last;
    }
    PageStep::Continue(progress.requested_start + progress.received)
}

fn supported_items(rows: Vec<ContentDto>, space_key: &str) -> Vec<ContentItem> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            let content_type = row.content_type.clone();
            let item = row.into_item(space_key);
            if item.is_none() {
                debug!(content_id = %id, content_type = %content_type, "skipping unsupported content type");
            }
            item
        })
        .collect()
}

fn resource_url(base_url: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    if link.starts_with('/') {
        format!("{base_url}{link}")
    } else {
        format!("{base_url}/{link}")
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct PagedResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    start: Option<usize>,
    #[serde(default, rename = "_links")]
    links: Option<ResourceLinks>,
}

#[derive(Debug, Deserialize, Default)]
struct ResourceLinks {
    next: Option<String>,
    download: Option<String>,
    webui: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDto {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    ancestors: Vec<AncestorDto>,
    body: Option<BodyDto>,
    space: Option<SpaceKeyDto>,
}

impl ContentDto {
    fn into_item(self, space_key: &str) -> Option<ContentItem> {
        let kind = ContentKind::parse(&self.content_type)?;
        Some(ContentItem {
            id: self.id,
            kind,
            title: self.title,
            ancestors: self
                .ancestors
                .into_iter()
                .map(|ancestor| ancestor.id)
                .collect(),
            body: self
                .body
                .and_then(|body| body.storage)
                .map(|storage| storage.value),
            space_key: self
                .space
                .map(|space| space.key)
                .unwrap_or_else(|| space_key.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AncestorDto {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct BodyDto {
    storage: Option<StorageDto>,
}

#[derive(Debug, Deserialize)]
struct StorageDto {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct SpaceKeyDto {
    key: String,
}

#[derive(Debug, Deserialize)]
struct SpaceDto {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    key: String,
    #[serde(default)]
    name: String,
    description: Option<SpaceDescriptionDto>,
    #[serde(rename = "type")]
    space_type: Option<String>,
    #[serde(default, rename = "_links")]
    links: Option<ResourceLinks>,
}

impl SpaceDto {
    fn into_info(self, base_url: &str) -> SpaceInfo {
        SpaceInfo {
            id: self.id,
            description: self
                .description
                .and_then(|description| description.plain)
                .map(|plain| plain.value)
                .unwrap_or_default(),
            url: self
                .links
                .and_then(|links| links.webui)
                .map(|link| resource_url(base_url, &link)),
            key: self.key,
            name: self.name,
            space_type: self.space_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpaceDescriptionDto {
    plain: Option<StorageDto>,
}

#[derive(Debug, Deserialize)]
struct AttachmentDto {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    title: String,
    metadata: Option<MediaTypeDto>,
    extensions: Option<MediaTypeDto>,
    #[serde(default, rename = "_links")]
    links: Option<ResourceLinks>,
}

impl AttachmentDto {
    fn into_attachment(self) -> SourceAttachment {
        let media_type = self
            .metadata
            .and_then(|metadata| metadata.media_type)
            .or_else(|| self.extensions.and_then(|extensions| extensions.media_type));
        SourceAttachment {
            id: self.id,
            title: self.title,
            media_type,
            download_path: self
                .links
                .and_then(|links| links.download)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MediaTypeDto {
    #[serde(rename = "mediaType")]
    media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentDto {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    body: Option<BodyDto>,
    history: Option<HistoryDto>,
}

impl CommentDto {
    fn into_comment(self) -> SourceComment {
        SourceComment {
            id: self.id,
            body: self
                .body
                .and_then(|body| body.storage)
                .map(|storage| storage.value)
                .unwrap_or_default(),
            author: self
                .history
                .and_then(|history| history.created_by)
                .and_then(|user| user.display_name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryDto {
    #[serde(rename = "createdBy")]
    created_by: Option<UserDto>,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedContentDto {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
}

impl CreatedContentDto {
    fn into_created(self) -> CreatedContent {
        CreatedContent { id: self.id }
    }
}

#[derive(Debug, Deserialize)]
struct LabelDto {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default = "global_prefix")]
    prefix: String,
    name: String,
}

impl LabelDto {
    fn into_label(self) -> SourceLabel {
        SourceLabel {
            id: self.id,
            prefix: self.prefix,
            name: self.name,
        }
    }
}

fn global_prefix() -> String {
    "global".to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::InstanceSection;

    #[test]
    fn content_dto_maps_ancestors_root_first() {
        let row: ContentDto = serde_json::from_value(json!({
            "id": "300",
            "type": "page",
            "title": "Design",
            "ancestors": [{"id": "100"}, {"id": 200}],
            "body": {"storage": {"value": "<p>design notes</p>", "representation": "storage"}},
            "space": {"key": "SRC"}
        }))
        .expect("decode");

        let item = row.into_item("").expect("supported type");
        assert_eq!(item.kind, ContentKind::Page);
        assert_eq!(item.ancestors, vec!["100".to_string(), "200".to_string()]);
        assert_eq!(item.parent_id(), Some("200"));
        assert_eq!(item.body.as_deref(), Some("<p>design notes</p>"));
        assert_eq!(item.space_key, "SRC");
    }

    #[test]
    fn unsupported_types_are_dropped() {
        let rows: Vec<ContentDto> = serde_json::from_value(json!([
            {"id": "1", "type": "folder", "title": "Specs"},
            {"id": "2", "type": "blogpost", "title": "News"},
            {"id": "3", "type": "whiteboard", "title": "Board"}
        ]))
        .expect("decode");

        let items = supported_items(rows, "SRC");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, ContentKind::Folder);
        assert_eq!(items[0].space_key, "SRC");
        assert!(items[0].is_root());
    }

    #[test]
    fn paged_response_reads_next_link() {
        let page: PagedResponse<ContentDto> = serde_json::from_value(json!({
            "results": [{"id": "1", "type": "page", "title": "A"}],
            "start": 0,
            "limit": 1,
            "size": 1,
            "_links": {"next": "/rest/api/content?start=1"}
        }))
        .expect("decode");
        assert_eq!(page.results.len(), 1);
        assert!(page.links.and_then(|links| links.next).is_some());
    }

    fn progress(requested_start: usize, received: usize, has_next: bool) -> PageProgress {
        PageProgress {
            requested_start,
            echoed_start: Some(requested_start),
            received,
            limit: 25,
            has_next,
            repeats_previous: false,
        }
    }

    #[test]
    fn pagination_advances_by_rows_received() {
        assert_eq!(next_page(&progress(0, 25, true)), PageStep::Continue(25));
        assert_eq!(next_page(&progress(25, 10, true)), PageStep::Continue(35));
        // A full page without links may still have more behind it.
        assert_eq!(next_page(&progress(50, 25, false)), PageStep::Continue(75));
    }

    #[test]
    fn pagination_stops_on_short_or_empty_page() {
        assert_eq!(next_page(&progress(0, 3, false)), PageStep::Last);
        assert_eq!(next_page(&progress(25, 0, true)), PageStep::Last);
        assert_eq!(next_page(&progress(0, 0, false)), PageStep::Last);
    }

    #[test]
    fn pagination_stops_when_offset_is_ignored() {
        let ignored = PageProgress {
            echoed_start: Some(0),
            ..progress(25, 25, true)
        };
        assert_eq!(next_page(&ignored), PageStep::Replayed);

        let repeated = PageProgress {
            echoed_start: None,
            repeats_previous: true,
            ..progress(25, 25, true)
        };
        assert_eq!(next_page(&repeated), PageStep::Replayed);

        let first = PageProgress {
            echoed_start: None,
            ..progress(0, 25, true)
        };
        assert_eq!(next_page(&first), PageStep::Continue(25));
    }

    #[test]
    fn label_dto_defaults_prefix() {
        let rows: PagedResponse<LabelDto> = serde_json::from_value(json!({
            "results": [
                {"prefix": "my", "name": "favourite", "id": 5},
                {"name": "runbook", "id": "6"}
            ],
            "start": 0
        }))
        .expect("decode");
        assert_eq!(rows.start, Some(0));
        let labels: Vec<SourceLabel> = rows
            .results
            .into_iter()
            .map(LabelDto::into_label)
            .collect();
        assert_eq!(labels[0].prefix, "my");
        assert_eq!(labels[0].id, "5");
        assert_eq!(labels[1].prefix, "global");
    }

    #[test]
    fn space_dto_accepts_numeric_id() {
        let space: SpaceDto = serde_json::from_value(json!({
            "id": 131226,
            "key": "CMT",
            "name": "Migration Testing",
            "description": {"plain": {"value": "Test space", "representation": "plain"}},
            "type": "global",
            "_links": {"webui": "/spaces/CMT"}
        }))
        .expect("decode");

        let info = space.into_info("https://source.example.net/wiki");
        assert_eq!(info.id, "131226");
        assert_eq!(info.description, "Test space");
        assert_eq!(
            info.url.as_deref(),
            Some("https://source.example.net/wiki/spaces/CMT")
        );
    }

    #[test]
    fn attachment_dto_prefers_metadata_media_type() {
        let row: AttachmentDto = serde_json::from_value(json!({
            "id": "att9",
            "title": "diagram.png",
            "metadata": {"mediaType": "image/png"},
            "extensions": {"mediaType": "application/octet-stream"},
            "_links": {"download": "/download/attachments/300/diagram.png?version=1"}
        }))
        .expect("decode");

        let attachment = row.into_attachment();
        assert_eq!(attachment.media_type.as_deref(), Some("image/png"));
        assert_eq!(
            attachment.download_path,
            "/download/attachments/300/diagram.png?version=1"
        );
    }

    #[test]
    fn comment_dto_reads_author_and_body() {
        let row: CommentDto = serde_json::from_value(json!({
            "id": "c1",
            "body": {"storage": {"value": "<p>looks good</p>"}},
            "history": {"createdBy": {"displayName": "Reviewer"}}
        }))
        .expect("decode");

        let comment = row.into_comment();
        assert_eq!(comment.body, "<p>looks good</p>");
        assert_eq!(comment.author.as_deref(), Some("Reviewer"));
    }

    #[test]
    fn resource_url_joins_relative_links() {
        let base = "https://source.example.net/wiki";
        assert_eq!(
            resource_url(base, "/download/a.png"),
            "https://source.example.net/wiki/download/a.png"
        );
        assert_eq!(
            resource_url(base, "download/a.png"),
            "https://source.example.net/wiki/download/a.png"
        );
        assert_eq!(
            resource_url(base, "https://cdn.example.net/a.png"),
            "https://cdn.example.net/a.png"
        );
    }

    #[test]
    fn client_config_requires_base_url() {
        let config = MigratorConfig {
            target: InstanceSection {
                base_url: Some("https://target.example.net/wiki/".to_string()),
                ..InstanceSection::default()
            },
            ..MigratorConfig::default()
        };
        if std::env::var("TARGET_BASE_URL").is_err() {
            let resolved = ConfluenceClientConfig::from_config(&config, InstanceRole::Target)
                .expect("target configured");
            assert_eq!(resolved.base_url, "https://target.example.net/wiki");
        }
        if std::env::var("SOURCE_BASE_URL").is_err() {
            let error = ConfluenceClientConfig::from_config(&config, InstanceRole::Source)
                .expect_err("source missing");
            assert!(error.to_string().contains("source base URL is not configured"));
        }
    }
}
