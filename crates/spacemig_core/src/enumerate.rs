use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::SourceApi;
use crate::model::{ContentItem, ContentKind, SpaceInfo};

/// How the folder set was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderSource {
    Query,
    FullListing,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct EnumeratedContent {
    /// `None` when the space metadata could not be fetched.
    pub space: Option<SpaceInfo>,
    pub pages: Vec<ContentItem>,
    pub folders: Vec<ContentItem>,
    pub excluded_home_pages: Vec<String>,
    pub folder_source: FolderSource,
}

impl EnumeratedContent {
    pub fn total_items(&self) -> usize {
        self.pages.len() + self.folders.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCounts {
    pub total_pages: usize,
    pub total_folders: usize,
    pub root_pages: usize,
    pub child_pages: usize,
    pub root_folders: usize,
    pub child_folders: usize,
    pub total_attachments: usize,
    pub total_comments: usize,
    /// Pages, folders, attachments and comments together.
    pub total_items: usize,
}

pub fn folder_query(space_key: &str) -> String {
    format!("space=\"{space_key}\" AND type=folder")
}

/// List the pages and folders of a space, minus its home page.
///
/// Only a failure to list pages is fatal. Folder discovery degrades from the
/// structured query to a full listing to an empty set.
pub fn enumerate<S: SourceApi>(source: &mut S, space_key: &str) -> Result<EnumeratedContent> {
    let space = match source.get_space(space_key) {
        Ok(space) => Some(space),
        Err(error) => {
            warn!(space_key, "could not fetch space metadata, home page will not be excluded: {error}");
            None
        }
    };

    let pages = source
        .list_content(space_key, Some(ContentKind::Page.as_str()))
        .with_context(|| format!("failed to list pages of space {space_key}"))?;
    let pages: Vec<ContentItem> = pages
        .into_iter()
        .filter(|item| item.kind == ContentKind::Page)
        .collect();

    let (folders, folder_source) = enumerate_folders(source, space_key);

    let (pages, excluded_home_pages) = match &space {
        Some(space) => exclude_home_pages(pages, &space.name),
        None => (pages, Vec::new()),
    };
    for id in &excluded_home_pages {
        debug!(space_key, source_id = %id, "excluded home page");
    }

    info!(
        space_key,
        pages = pages.len(),
        folders = folders.len(),
        "enumerated source content"
    );

    Ok(EnumeratedContent {
        space,
        pages,
        folders,
        excluded_home_pages,
        folder_source,
    })
}

fn enumerate_folders<S: SourceApi>(
    source: &mut S,
    space_key: &str,
) -> (Vec<ContentItem>, FolderSource) {
    match source.query_content(&folder_query(space_key)) {
        Ok(items) => return (only_folders(items), FolderSource::Query),
        Err(error) => {
            warn!(space_key, "folder query failed, falling back to full listing: {error}");
        }
    }

    match source.list_content(space_key, None) {
        Ok(items) => (only_folders(items), FolderSource::FullListing),
        Err(error) => {
            warn!(space_key, "full listing failed, continuing without folders: {error}");
            (Vec::new(), FolderSource::Unavailable)
        }
    }
}

fn only_folders(items: Vec<ContentItem>) -> Vec<ContentItem> {
    items
        .into_iter()
        .filter(|item| item.kind == ContentKind::Folder)
        .collect()
}

pub fn is_home_page(title: &str, space_name: &str) -> bool {
    let space_name = space_name.trim();
    !space_name.is_empty() && title.trim().to_lowercase() == space_name.to_lowercase()
}

/// Split pages into (kept, excluded ids). Applying it twice changes nothing.
pub fn exclude_home_pages(
    pages: Vec<ContentItem>,
    space_name: &str,
) -> (Vec<ContentItem>, Vec<String>) {
    let mut kept = Vec::with_capacity(pages.len());
    let mut excluded = Vec::new();
    for page in pages {
        if is_home_page(&page.title, space_name) {
            excluded.push(page.id);
        } else {
            kept.push(page);
        }
    }
    (kept, excluded)
}

/// Count what a migration of `space_key` would attempt.
pub fn count_content<S: SourceApi>(source: &mut S, space_key: &str) -> Result<ContentCounts> {
    let content = enumerate(source, space_key)?;

    let mut counts = ContentCounts {
        total_pages: content.pages.len(),
        total_folders: content.folders.len(),
        ..ContentCounts::default()
    };
    for page in &content.pages {
        if page.is_root() {
            counts.root_pages += 1;
        } else {
            counts.child_pages += 1;
        }
    }
    for folder in &content.folders {
        if folder.is_root() {
            counts.root_folders += 1;
        } else {
            counts.child_folders += 1;
        }
    }

    for page in &content.pages {
        match source.list_attachments(&page.id) {
            Ok(attachments) => counts.total_attachments += attachments.len(),
            Err(error) => warn!(source_id = %page.id, "could not count attachments: {error}"),
        }
        match source.list_comments(&page.id) {
            Ok(comments) => counts.total_comments += comments.len(),
            Err(error) => warn!(source_id = %page.id, "could not count comments: {error}"),
        }
    }
    counts.total_items =
        content.total_items() + counts.total_attachments + counts.total_comments;

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{SourceAttachment, SourceComment};
    use crate::test_support::{MockSource, item};

    #[test]
    fn home_page_filter_is_case_and_whitespace_insensitive() {
        assert!(is_home_page("  migration testing ", "Migration Testing"));
        assert!(!is_home_page("Migration Testing Notes", "Migration Testing"));
        assert!(!is_home_page("", "  "));
    }

    #[test]
    fn home_page_filter_is_idempotent() {
        let pages = vec![
            item("1", ContentKind::Page, "ReadMe", &[]),
            item("2", ContentKind::Page, "Design", &[]),
            item("3", ContentKind::Page, "readme ", &[]),
        ];
        let (once, excluded) = exclude_home_pages(pages, "ReadMe");
        assert_eq!(excluded, vec!["1".to_string(), "3".to_string()]);
        let (twice, excluded_again) = exclude_home_pages(once.clone(), "ReadMe");
        assert_eq!(once, twice);
        assert!(excluded_again.is_empty());
    }

    #[test]
    fn enumerate_uses_folder_query_and_excludes_home_page() {
        let mut source = MockSource::with_space("ReadMe");
        source.items = vec![
            item("10", ContentKind::Folder, "Specs", &[]),
            item("20", ContentKind::Page, "Design", &["10"]),
            item("30", ContentKind::Page, "ReadMe", &[]),
        ];

        let content = enumerate(&mut source, "SRC").expect("enumerate");
        assert_eq!(content.folder_source, FolderSource::Query);
        assert_eq!(content.folders.len(), 1);
        assert_eq!(content.pages.len(), 1);
        assert_eq!(content.pages[0].id, "20");
        assert_eq!(content.excluded_home_pages, vec!["30".to_string()]);
    }

    #[test]
    fn folder_discovery_degrades_to_full_listing_then_empty() {
        let mut source = MockSource::with_space("Space");
        source.items = vec![
            item("10", ContentKind::Folder, "Specs", &[]),
            item("20", ContentKind::Page, "Design", &["10"]),
        ];
        source.fail_query = true;

        let content = enumerate(&mut source, "SRC").expect("enumerate");
        assert_eq!(content.folder_source, FolderSource::FullListing);
        assert_eq!(content.folders.len(), 1);

        source.fail_full_listing = true;
        let content = enumerate(&mut source, "SRC").expect("enumerate");
        assert_eq!(content.folder_source, FolderSource::Unavailable);
        assert!(content.folders.is_empty());
        assert_eq!(content.pages.len(), 1);
    }

    #[test]
    fn page_listing_failure_is_fatal() {
        let mut source = MockSource::with_space("Space");
        source.fail_pages = true;
        let error = enumerate(&mut source, "SRC").expect_err("must fail");
        assert!(error.to_string().contains("failed to list pages of space SRC"));
    }

    #[test]
    fn missing_space_metadata_skips_home_page_exclusion() {
        let mut source = MockSource::default();
        source.items = vec![item("30", ContentKind::Page, "ReadMe", &[])];
        let content = enumerate(&mut source, "SRC").expect("enumerate");
        assert!(content.space.is_none());
        assert_eq!(content.pages.len(), 1);
        assert!(content.excluded_home_pages.is_empty());
    }

    #[test]
    fn count_content_splits_roots_and_children() {
        let mut source = MockSource::with_space("Home");
        source.items = vec![
            item("10", ContentKind::Folder, "Specs", &[]),
            item("11", ContentKind::Folder, "Drafts", &["10"]),
            item("20", ContentKind::Page, "Design", &["10"]),
            item("21", ContentKind::Page, "Overview", &[]),
            item("22", ContentKind::Page, "Home", &[]),
        ];
        source.attachments.insert(
            "20".to_string(),
            vec![SourceAttachment {
                id: "a1".to_string(),
                title: "diagram.png".to_string(),
                media_type: Some("image/png".to_string()),
                download_path: "/download/a1".to_string(),
            }],
        );
        source.comments.insert(
            "21".to_string(),
            vec![
                SourceComment {
                    id: "c1".to_string(),
                    body: "<p>one</p>".to_string(),
                    author: None,
                },
                SourceComment {
                    id: "c2".to_string(),
                    body: "<p>two</p>".to_string(),
                    author: None,
                },
            ],
        );
        source.fail_comment_listing = vec!["20".to_string()];

        let counts = count_content(&mut source, "SRC").expect("count");
        assert_eq!(
            counts,
            ContentCounts {
                total_pages: 2,
                total_folders: 2,
                root_pages: 1,
                child_pages: 1,
                root_folders: 1,
                child_folders: 1,
                total_attachments: 1,
                total_comments: 2,
                total_items: 7,
            }
        );
    }

    #[test]
    fn count_total_includes_attachments_and_comments() {
        let mut source = MockSource::with_space("Home");
        source.items = vec![item("20", ContentKind::Page, "Design", &[])];
        source.attachments.insert(
            "20".to_string(),
            vec![SourceAttachment {
                id: "a1".to_string(),
                title: "diagram.png".to_string(),
                media_type: None,
                download_path: "/download/a1".to_string(),
            }],
        );
        source.comments.insert(
            "20".to_string(),
            vec![
                SourceComment {
                    id: "c1".to_string(),
                    body: "<p>one</p>".to_string(),
                    author: None,
                },
                SourceComment {
                    id: "c2".to_string(),
                    body: "<p>two</p>".to_string(),
                    author: None,
                },
            ],
        );

        let counts = count_content(&mut source, "SRC").expect("count");
        assert_eq!(counts.total_pages, 1);
        assert_eq!(counts.total_attachments, 1);
        assert_eq!(counts.total_comments, 2);
        assert_eq!(counts.total_items, 4);
    }

    #[test]
    fn folder_query_filters_space_and_type() {
        assert_eq!(folder_query("CMT"), "space=\"CMT\" AND type=folder");
    }
}
