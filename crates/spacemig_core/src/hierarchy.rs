//! Creation ordering and the run-scoped source-to-target id table.
//!
//! `creation_order` is a depth heuristic, not a topological sort. Within each
//! type it puts roots first, then items by ascending ancestor-chain length with
//! ties broken by immediate-parent id, and it places every folder before every
//! page. That is enough for parents to precede children as long as:
//!
//! - ancestor chains come back root-first, and
//! - no page parents a folder (a folder under a page would be ordered before
//!   the page and degrade to root).
//!
//! Both hold for the sources this tool reads. Items whose parent never made it
//! into the mapping are created at the root of the target space.

use std::collections::BTreeMap;

use crate::model::{ContentItem, ContentKind};

/// Folders first, then pages; each partition stably sorted by
/// (depth, immediate parent id).
pub fn creation_order(folders: Vec<ContentItem>, pages: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut ordered = sort_partition(folders);
    ordered.extend(sort_partition(pages));
    ordered
}

fn sort_partition(mut items: Vec<ContentItem>) -> Vec<ContentItem> {
    items.sort_by(|left, right| {
        left.depth()
            .cmp(&right.depth())
            .then_with(|| left.parent_id().cmp(&right.parent_id()))
    });
    items
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedTarget {
    pub target_id: String,
    pub kind: ContentKind,
}

#[derive(Debug, Default)]
pub struct IdMapping {
    entries: BTreeMap<String, MappedTarget>,
}

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source_id: &str, target_id: &str, kind: ContentKind) {
        self.entries.insert(
            source_id.to_string(),
            MappedTarget {
                target_id: target_id.to_string(),
                kind,
            },
        );
    }

    pub fn resolve(&self, source_id: &str) -> Option<&MappedTarget> {
        self.entries.get(source_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
