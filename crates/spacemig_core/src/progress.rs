//! Migration progress events, sinks and the run cancel token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::driver::{DriverState, MigrationSummary};
use crate::model::{ContentKind, SubResourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    StateChanged {
        state: DriverState,
    },
    ItemStarted {
        index: usize,
        total: usize,
        source_id: String,
        title: String,
        kind: ContentKind,
    },
    ItemSucceeded {
        index: usize,
        total: usize,
        source_id: String,
        target_id: String,
        fallback: bool,
    },
    ItemFailed {
        index: usize,
        total: usize,
        source_id: String,
        error: String,
    },
    SubResourceFailed {
        page_source_id: String,
        kind: SubResourceKind,
        source_id: String,
        error: String,
    },
    RunCompleted {
        summary: MigrationSummary,
    },
}

pub trait ProgressSink {
    fn handle_event(&mut self, event: &MigrationEvent);
}

/// Discards every event.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn handle_event(&mut self, _event: &MigrationEvent) {}
}

impl ProgressSink for Vec<MigrationEvent> {
    fn handle_event(&mut self, event: &MigrationEvent) {
        self.push(event.clone());
    }
}

/// Renders events as log lines.
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn handle_event(&mut self, event: &MigrationEvent) {
        match event {
            MigrationEvent::StateChanged { state } => {
                debug!(state = state.as_str(), "migration state changed");
            }
            MigrationEvent::ItemStarted {
                index,
                total,
                source_id,
                title,
                kind,
            } => {
                info!(
                    "[{}/{}] migrating {} {:?} ({})",
                    index + 1,
                    total,
                    kind,
                    title,
                    source_id
                );
            }
            MigrationEvent::ItemSucceeded {
                index,
                total,
                source_id,
                target_id,
                fallback,
            } => {
                if *fallback {
                    info!(
                        "[{}/{}] {} -> {} (created as placeholder page)",
                        index + 1,
                        total,
                        source_id,
                        target_id
                    );
                } else {
                    info!("[{}/{}] {} -> {}", index + 1, total, source_id, target_id);
                }
            }
            MigrationEvent::ItemFailed {
                index,
                total,
                source_id,
                error,
            } => {
                warn!("[{}/{}] {} failed: {}", index + 1, total, source_id, error);
            }
            MigrationEvent::SubResourceFailed {
                page_source_id,
                kind,
                source_id,
                error,
            } => {
                warn!(
                    page_source_id = %page_source_id,
                    source_id = %source_id,
                    "{} failed: {}",
                    kind.as_str(),
                    error
                );
            }
            MigrationEvent::RunCompleted { summary } => {
                info!(
                    total = summary.total,
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    fallbacks = summary.fallbacks,
                    "migration finished"
                );
            }
        }
    }
}

/// Run-wide abort flag shared between the caller and the driver.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
