use tracing::{debug, warn};

use crate::api::{
    AttachmentUpload, NewContent, NewLabel, SourceApi, SourceAttachment, SourceComment,
    SourceLabel, TargetApi,
};
use crate::error::ApiError;
use crate::model::{SubResourceKind, SubResourceRecord};

pub const ATTACHMENT_UPLOAD_COMMENT: &str = "Migrated attachment";

/// Copy the attachments, comments and labels of a migrated page.
///
/// Every sub-resource is attempted; failures are recorded, never propagated.
/// A kind whose listing fails yields one failed record with an empty source id.
pub fn migrate_page_resources<S: SourceApi, T: TargetApi>(
    source: &mut S,
    target: &mut T,
    page_source_id: &str,
    page_target_id: &str,
) -> Vec<SubResourceRecord> {
    let mut records = Vec::new();
    let batches = [
        (
            SubResourceKind::Attachment,
            migrate_attachments(source, target, page_source_id, page_target_id),
        ),
        (
            SubResourceKind::Comment,
            migrate_comments(source, target, page_source_id, page_target_id),
        ),
        (
            SubResourceKind::Label,
            migrate_labels(source, target, page_source_id, page_target_id),
        ),
    ];
    for (kind, batch) in batches {
        match batch {
            Ok(batch) => records.extend(batch),
            Err(error) => records.push(listing_failure(page_source_id, kind, &error)),
        }
    }
    records
}

/// Copy every attachment of one page. Only the listing call can fail the batch.
pub fn migrate_attachments<S: SourceApi, T: TargetApi>(
    source: &mut S,
    target: &mut T,
    page_source_id: &str,
    page_target_id: &str,
) -> Result<Vec<SubResourceRecord>, ApiError> {
    let attachments = source.list_attachments(page_source_id)?;
    Ok(attachments
        .iter()
        .map(|attachment| {
            copy_attachment(source, target, page_source_id, page_target_id, attachment)
        })
        .collect())
}

/// Copy every comment of one page. Only the listing call can fail the batch.
pub fn migrate_comments<S: SourceApi, T: TargetApi>(
    source: &mut S,
    target: &mut T,
    page_source_id: &str,
    page_target_id: &str,
) -> Result<Vec<SubResourceRecord>, ApiError> {
    let comments = source.list_comments(page_source_id)?;
    Ok(comments
        .iter()
        .map(|comment| copy_comment(target, page_source_id, page_target_id, comment))
        .collect())
}

/// Apply the page's labels to the new page in a single call.
///
/// Labels share that call's outcome. A label missing from the target's reply
/// is recorded as failed.
pub fn migrate_labels<S: SourceApi, T: TargetApi>(
    source: &mut S,
    target: &mut T,
    page_source_id: &str,
    page_target_id: &str,
) -> Result<Vec<SubResourceRecord>, ApiError> {
    let labels = source.list_labels(page_source_id)?;
    if labels.is_empty() {
        return Ok(Vec::new());
    }

    let kind = SubResourceKind::Label;
    let payload: Vec<NewLabel> = labels.iter().map(NewLabel::from).collect();
    let applied = match target.add_labels(page_target_id, &payload) {
        Ok(applied) => applied,
        Err(error) => {
            warn!(page_source_id, labels = labels.len(), "label copy failed: {error}");
            return Ok(labels
                .iter()
                .map(|label| {
                    SubResourceRecord::failed(page_source_id, kind, &label.id, &label.name, &error)
                })
                .collect());
        }
    };

    Ok(labels
        .iter()
        .map(|label: &SourceLabel| {
            match applied.iter().find(|created| created.name == label.name) {
                Some(created) => {
                    debug!(label = %label.name, target_id = %created.id, "label migrated");
                    SubResourceRecord::succeeded(
                        page_source_id,
                        kind,
                        &label.id,
                        &label.name,
                        created.id.clone(),
                    )
                }
                None => {
                    warn!(page_source_id, label = %label.name, "label missing after copy");
                    SubResourceRecord::failed(
                        page_source_id,
                        kind,
                        &label.id,
                        &label.name,
                        "label was not applied by the target",
                    )
                }
            }
        })
        .collect())
}

fn copy_attachment<S: SourceApi, T: TargetApi>(
    source: &mut S,
    target: &mut T,
    page_source_id: &str,
    page_target_id: &str,
    attachment: &SourceAttachment,
) -> SubResourceRecord {
    let kind = SubResourceKind::Attachment;
    let bytes = match source.download_attachment(attachment) {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(source_id = %attachment.id, title = %attachment.title, "attachment download failed: {error}");
            return SubResourceRecord::failed(
                page_source_id,
                kind,
                &attachment.id,
                &attachment.title,
                format!("download failed: {error}"),
            );
        }
    };

    let upload = AttachmentUpload {
        file_name: attachment.title.clone(),
        media_type: attachment.media_type.clone(),
        bytes,
        comment: ATTACHMENT_UPLOAD_COMMENT.to_string(),
    };
    match target.upload_attachment(page_target_id, &upload) {
        Ok(created) => {
            debug!(source_id = %attachment.id, target_id = %created.id, "attachment migrated");
            SubResourceRecord::succeeded(
                page_source_id,
                kind,
                &attachment.id,
                &attachment.title,
                created.id,
            )
        }
        Err(error) => {
            warn!(source_id = %attachment.id, title = %attachment.title, "attachment upload failed: {error}");
            SubResourceRecord::failed(
                page_source_id,
                kind,
                &attachment.id,
                &attachment.title,
                format!("upload failed: {error}"),
            )
        }
    }
}

fn copy_comment<T: TargetApi>(
    target: &mut T,
    page_source_id: &str,
    page_target_id: &str,
    comment: &SourceComment,
) -> SubResourceRecord {
    let kind = SubResourceKind::Comment;
    let title = comment
        .author
        .as_deref()
        .map(|author| format!("comment by {author}"))
        .unwrap_or_else(|| "comment".to_string());

    match target.create_content(&NewContent::comment(page_target_id, &comment.body)) {
        Ok(created) => {
            debug!(source_id = %comment.id, target_id = %created.id, "comment migrated");
            SubResourceRecord::succeeded(page_source_id, kind, &comment.id, &title, created.id)
        }
        Err(error) => {
            warn!(source_id = %comment.id, "comment creation failed: {error}");
            SubResourceRecord::failed(page_source_id, kind, &comment.id, &title, error)
        }
    }
}

fn listing_failure(
    page_source_id: &str,
    kind: SubResourceKind,
    error: &ApiError,
) -> SubResourceRecord {
    warn!(page_source_id, "could not list {}s: {error}", kind.as_str());
    SubResourceRecord::failed(
        page_source_id,
        kind,
        "",
        "",
        format!("failed to list {}s: {error}", kind.as_str()),
    )
}
