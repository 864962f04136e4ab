//! Migration driver.
//!
//! One `Driver` owns the id mapping and result lists for a single run and walks
//! `PENDING -> SPACE_CREATING -> SPACE_READY | SPACE_FAILED -> CONTENT_MIGRATING
//! -> DONE`. Items are processed strictly in creation order, one call at a time.
//! When the target space cannot be created every item is recorded as failed
//! without issuing any creation call.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{CreatedSpace, NewSpace, SourceApi, TargetApi};
use crate::create::{CreationContext, create_item};
use crate::enumerate::{FolderSource, enumerate};
use crate::error::ItemError;
use crate::hierarchy::{IdMapping, creation_order};
use crate::model::{
    ContentItem, ContentKind, MigrationRecord, SubResourceKind, SubResourceRecord,
};
use crate::progress::{CancelToken, MigrationEvent, ProgressSink};
use crate::subresources::migrate_page_resources;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverState {
    Pending,
    SpaceCreating,
    SpaceReady,
    SpaceFailed,
    ContentMigrating,
    Done,
}

impl DriverState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::SpaceCreating => "SPACE_CREATING",
            Self::SpaceReady => "SPACE_READY",
            Self::SpaceFailed => "SPACE_FAILED",
            Self::ContentMigrating => "CONTENT_MIGRATING",
            Self::Done => "DONE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    pub source_space_key: String,
    pub source_space_id: Option<String>,
    pub target_space_key: String,
    pub target_space_name: String,
    pub target_space_description: String,
}

#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    pub title_prefix: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl TypeTally {
    fn add(&mut self, success: bool) {
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Folders that ended up as placeholder pages.
    pub fallbacks: usize,
    pub by_type: BTreeMap<String, TypeTally>,
    pub attachments: TypeTally,
    pub comments: TypeTally,
    pub labels: TypeTally,
}

impl MigrationSummary {
    pub fn from_records(records: &[MigrationRecord], sub_records: &[SubResourceRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            if record.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if record.is_fallback() {
                summary.fallbacks += 1;
            }
            summary
                .by_type
                .entry(record.kind.as_str().to_string())
                .or_default()
                .add(record.success);
        }
        for record in sub_records {
            match record.kind {
                SubResourceKind::Attachment => summary.attachments.add(record.success),
                SubResourceKind::Comment => summary.comments.add(record.success),
                SubResourceKind::Label => summary.labels.add(record.success),
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCounts {
    pub total_pages: usize,
    pub total_folders: usize,
    pub total_items: usize,
    pub migrated_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub success: bool,
    pub message: String,
    pub source_space_key: String,
    pub target_space_key: String,
    pub space_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_space: Option<CreatedSpace>,
    pub excluded_home_pages: Vec<String>,
    /// How the folder set was discovered; `unavailable` means no folders were migrated.
    pub folder_source: FolderSource,
    pub counts: RunCounts,
    pub summary: MigrationSummary,
    pub migration_results: Vec<MigrationRecord>,
    pub sub_resource_results: Vec<SubResourceRecord>,
    pub source_requests: usize,
    pub target_requests: usize,
}

pub struct Driver<'a, S, T> {
    source: &'a mut S,
    target: &'a mut T,
    progress: Option<&'a mut dyn ProgressSink>,
    cancel: CancelToken,
    options: MigrationOptions,
    state: DriverState,
    mapping: IdMapping,
    records: Vec<MigrationRecord>,
    sub_records: Vec<SubResourceRecord>,
}

impl<'a, S: SourceApi, T: TargetApi> Driver<'a, S, T> {
    pub fn new(source: &'a mut S, target: &'a mut T, options: MigrationOptions) -> Self {
        Self {
            source,
            target,
            progress: None,
            cancel: CancelToken::default(),
            options,
            state: DriverState::Pending,
            mapping: IdMapping::new(),
            records: Vec::new(),
            sub_records: Vec::new(),
        }
    }

    pub fn with_progress(mut self, progress: &'a mut dyn ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn run(mut self, request: &MigrationRequest) -> Result<MigrationReport> {
        self.transition(DriverState::Pending);
        self.ensure_not_cancelled("enumeration")?;

        info!(
            source_space = %request.source_space_key,
            target_space = %request.target_space_key,
            "starting space migration"
        );
        let content = enumerate(&mut *self.source, &request.source_space_key)?;
        if let (Some(expected), Some(space)) = (&request.source_space_id, &content.space)
            && expected != &space.id
        {
            warn!(
                expected = %expected,
                actual = %space.id,
                "source space id does not match space key {}",
                request.source_space_key
            );
        }
        let total_pages = content.pages.len();
        let total_folders = content.folders.len();
        let excluded_home_pages = content.excluded_home_pages.clone();
        let folder_source = content.folder_source;
        let ordered = creation_order(content.folders, content.pages);
        for item in &ordered {
            if let Some(parent_id) = item.parent_id()
                && excluded_home_pages.iter().any(|id| id == parent_id)
            {
                debug!(source_id = %item.id, "parent is the excluded home page, item will be created at root");
            }
        }

        self.ensure_not_cancelled("space creation")?;
        self.transition(DriverState::SpaceCreating);
        let new_space = NewSpace::new(
            &request.target_space_key,
            &request.target_space_name,
            &request.target_space_description,
        );
        let (target_space, space_error) = match self.target.create_space(&new_space) {
            Ok(space) => {
                info!(space_key = %space.key, space_id = %space.id, "target space created");
                self.transition(DriverState::SpaceReady);
                (Some(space), None)
            }
            Err(error) => {
                warn!(
                    space_key = %request.target_space_key,
                    status = ?error.status(),
                    "target space creation failed, all items will be skipped: {error}"
                );
                self.transition(DriverState::SpaceFailed);
                (None, Some(error.to_string()))
            }
        };

        self.transition(DriverState::ContentMigrating);
        let context = CreationContext {
            target_space_key: request.target_space_key.clone(),
            title_prefix: self.options.title_prefix.clone(),
        };
        let total = ordered.len();
        for (index, item) in ordered.iter().enumerate() {
            self.ensure_not_cancelled(&format!("item {}", item.id))?;
            self.emit(MigrationEvent::ItemStarted {
                index,
                total,
                source_id: item.id.clone(),
                title: item.title.clone(),
                kind: item.kind,
            });
            if target_space.is_none() {
                self.record_failure(index, total, item, &ItemError::SpaceUnavailable);
                continue;
            }
            self.migrate_item(index, total, item, &context);
        }

        self.transition(DriverState::Done);
        let summary = MigrationSummary::from_records(&self.records, &self.sub_records);
        self.emit(MigrationEvent::RunCompleted {
            summary: summary.clone(),
        });

        let space_created = target_space.is_some();
        let message = if space_created {
            format!(
                "Migrated {} of {} items from {} to {}",
                summary.succeeded, summary.total, request.source_space_key, request.target_space_key
            )
        } else {
            format!(
                "Target space {} could not be created; {} items skipped",
                request.target_space_key, summary.total
            )
        };
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            fallbacks = summary.fallbacks,
            "{message}"
        );

        Ok(MigrationReport {
            success: true,
            message,
            source_space_key: request.source_space_key.clone(),
            target_space_key: request.target_space_key.clone(),
            space_created,
            space_error,
            target_space,
            excluded_home_pages,
            folder_source,
            counts: RunCounts {
                total_pages,
                total_folders,
                total_items: total,
                migrated_count: summary.succeeded,
                failed_count: summary.failed,
            },
            summary,
            migration_results: self.records,
            sub_resource_results: self.sub_records,
            source_requests: self.source.request_count(),
            target_requests: self.target.request_count(),
        })
    }

    fn migrate_item(
        &mut self,
        index: usize,
        total: usize,
        item: &ContentItem,
        context: &CreationContext,
    ) {
        let detailed = match self.source.get_content(&item.id) {
            Ok(fetched) => ContentItem {
                ancestors: fetched.ancestors,
                body: fetched.body,
                ..item.clone()
            },
            Err(error) => {
                self.record_failure(index, total, item, &ItemError::from(error));
                return;
            }
        };

        let created = match create_item(&mut *self.target, &detailed, &self.mapping, context) {
            Ok(created) => created,
            Err(error) => {
                self.record_failure(index, total, item, &error);
                return;
            }
        };

        self.mapping
            .register(&item.id, &created.target_id, item.kind);
        let record = MigrationRecord::succeeded(item, &created.target_id, created.fallback);
        let fallback = record.is_fallback();
        self.records.push(record);
        self.emit(MigrationEvent::ItemSucceeded {
            index,
            total,
            source_id: item.id.clone(),
            target_id: created.target_id.clone(),
            fallback,
        });

        if item.kind == ContentKind::Page {
            let sub_records = migrate_page_resources(
                &mut *self.source,
                &mut *self.target,
                &item.id,
                &created.target_id,
            );
            for record in sub_records {
                if !record.success {
                    self.emit(MigrationEvent::SubResourceFailed {
                        page_source_id: record.page_source_id.clone(),
                        kind: record.kind,
                        source_id: record.source_id.clone(),
                        error: record.error.clone().unwrap_or_default(),
                    });
                }
                self.sub_records.push(record);
            }
        }
    }

    fn record_failure(&mut self, index: usize, total: usize, item: &ContentItem, error: &ItemError) {
        if !matches!(error, ItemError::SpaceUnavailable) {
            warn!(
                source_id = %item.id,
                title = %item.title,
                status = ?error.status(),
                "{} migration failed: {error}",
                item.kind
            );
        }
        self.records.push(MigrationRecord::failed(item, error));
        self.emit(MigrationEvent::ItemFailed {
            index,
            total,
            source_id: item.id.clone(),
            error: error.to_string(),
        });
    }

    fn ensure_not_cancelled(&self, stage: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            warn!(processed = self.records.len(), "migration cancelled before {stage}");
            bail!("migration aborted: cancelled before {stage}");
        }
        Ok(())
    }

    fn transition(&mut self, state: DriverState) {
        self.state = state;
        self.emit(MigrationEvent::StateChanged { state });
    }

    fn emit(&mut self, event: MigrationEvent) {
        if let Some(progress) = self.progress.as_deref_mut() {
            progress.handle_event(&event);
        }
    }
}
