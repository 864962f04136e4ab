//! Operations exposed to callers, plus the name-based RPC dispatcher.

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::api::{CreatedSpace, NewSpace, SourceApi, TargetApi};
use crate::contracts::{
    CreateSpacePayload, MigrateSpacePayload, PagePairPayload, RpcMethod, SpaceKeyPayload,
};
use crate::driver::{Driver, MigrationOptions, MigrationReport, MigrationRequest};
use crate::enumerate::{ContentCounts, count_content};
use crate::model::{SpaceInfo, SubResourceRecord};
use crate::progress::{CancelToken, NoProgress, ProgressSink};
use crate::subresources::{migrate_attachments, migrate_comments};

pub fn list_spaces<S: SourceApi>(source: &mut S) -> Result<Vec<SpaceInfo>> {
    source.list_spaces().context("failed to list source spaces")
}

pub fn get_space_details<S: SourceApi>(source: &mut S, space_key: &str) -> Result<SpaceInfo> {
    source
        .get_space(space_key)
        .with_context(|| format!("failed to fetch space {space_key}"))
}

pub fn count_space_content<S: SourceApi>(source: &mut S, space_key: &str) -> Result<ContentCounts> {
    count_content(source, space_key)
}

pub fn create_target_space<T: TargetApi>(
    target: &mut T,
    key: &str,
    name: &str,
    description: &str,
) -> Result<CreatedSpace> {
    target
        .create_space(&NewSpace::new(key, name, description))
        .with_context(|| format!("failed to create target space {key}"))
}

pub fn migrate_space<S: SourceApi, T: TargetApi>(
    source: &mut S,
    target: &mut T,
    request: &MigrationRequest,
    options: MigrationOptions,
    progress: &mut dyn ProgressSink,
    cancel: CancelToken,
) -> Result<MigrationReport> {
    Driver::new(source, target, options)
        .with_progress(progress)
        .with_cancel(cancel)
        .run(request)
}

/// Copy the attachments of one page onto an existing target page.
pub fn migrate_page_attachments<S: SourceApi, T: TargetApi>(
    source: &mut S,
    target: &mut T,
    source_page_id: &str,
    target_page_id: &str,
) -> Result<Vec<SubResourceRecord>> {
    migrate_attachments(source, target, source_page_id, target_page_id)
        .with_context(|| format!("failed to list attachments of page {source_page_id}"))
}

/// Copy the comments of one page onto an existing target page.
pub fn migrate_page_comments<S: SourceApi, T: TargetApi>(
    source: &mut S,
    target: &mut T,
    source_page_id: &str,
    target_page_id: &str,
) -> Result<Vec<SubResourceRecord>> {
    migrate_comments(source, target, source_page_id, target_page_id)
        .with_context(|| format!("failed to list comments of page {source_page_id}"))
}

/// Routes RPC method names to the operations above.
pub struct CommandSurface<'a, S, T> {
    source: &'a mut S,
    target: &'a mut T,
    options: MigrationOptions,
    cancel: CancelToken,
    progress: Box<dyn ProgressSink + 'a>,
}

impl<'a, S: SourceApi, T: TargetApi> CommandSurface<'a, S, T> {
    pub fn new(source: &'a mut S, target: &'a mut T) -> Self {
        Self {
            source,
            target,
            options: MigrationOptions::default(),
            cancel: CancelToken::default(),
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_options(mut self, options: MigrationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress<P: ProgressSink + 'a>(mut self, progress: P) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Always returns an envelope; failures become `{success: false, error}`.
    pub fn dispatch(&mut self, method: &str, payload: Value) -> Value {
        debug!(method, "dispatching command");
        match self.execute(method, payload) {
            Ok(value) => value,
            Err(error) => {
                warn!(method, "command failed: {error:#}");
                json!({
                    "success": false,
                    "error": format!("{error:#}"),
                })
            }
        }
    }

    fn execute(&mut self, method: &str, payload: Value) -> Result<Value> {
        let method = RpcMethod::parse(method).ok_or_else(|| anyhow!("unknown method: {method}"))?;
        match method {
            RpcMethod::ListSpaces => {
                let spaces = list_spaces(&mut *self.source)?;
                Ok(json!({ "success": true, "spaces": spaces }))
            }
            RpcMethod::GetSpaceDetails => {
                let payload: SpaceKeyPayload = decode_payload(method, payload)?;
                payload.validate()?;
                let space = get_space_details(&mut *self.source, payload.space_key.trim())?;
                Ok(json!({ "success": true, "space": space }))
            }
            RpcMethod::CountContent => {
                let payload: SpaceKeyPayload = decode_payload(method, payload)?;
                payload.validate()?;
                let space_key = payload.space_key.trim();
                let counts = count_space_content(&mut *self.source, space_key)?;
                Ok(json!({ "success": true, "spaceKey": space_key, "counts": counts }))
            }
            RpcMethod::CreateSpace => {
                let payload: CreateSpacePayload = decode_payload(method, payload)?;
                payload.validate()?;
                let space = create_target_space(
                    &mut *self.target,
                    payload.key.trim(),
                    payload.name.trim(),
                    &payload.description,
                )?;
                Ok(json!({ "success": true, "space": space }))
            }
            RpcMethod::MigrateSpace => {
                let payload: MigrateSpacePayload = decode_payload(method, payload)?;
                payload.validate()?;
                let request = payload.into_request();
                let report = migrate_space(
                    &mut *self.source,
                    &mut *self.target,
                    &request,
                    self.options.clone(),
                    &mut *self.progress,
                    self.cancel.clone(),
                )?;
                serde_json::to_value(&report).context("failed to serialize migration report")
            }
            RpcMethod::MigrateAttachments => {
                let payload: PagePairPayload = decode_payload(method, payload)?;
                payload.validate()?;
                let results = migrate_page_attachments(
                    &mut *self.source,
                    &mut *self.target,
                    payload.source_page_id.trim(),
                    payload.target_page_id.trim(),
                )?;
                Ok(json!({ "success": true, "results": results }))
            }
            RpcMethod::MigrateComments => {
                let payload: PagePairPayload = decode_payload(method, payload)?;
                payload.validate()?;
                let results = migrate_page_comments(
                    &mut *self.source,
                    &mut *self.target,
                    payload.source_page_id.trim(),
                    payload.target_page_id.trim(),
                )?;
                Ok(json!({ "success": true, "results": results }))
            }
        }
    }
}

fn decode_payload<P: DeserializeOwned>(method: RpcMethod, payload: Value) -> Result<P> {
    let payload = if payload.is_null() { json!({}) } else { payload };
    serde_json::from_value(payload)
        .with_context(|| format!("invalid payload for {}", method.as_str()))
}
