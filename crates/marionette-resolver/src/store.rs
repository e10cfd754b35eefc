//! FIFO store of open requirements.

use crate::requirement::Requirement;
use marionette_core::{Slug, Version, VersionRange};
use marionette_manifest::Manifest;
use std::collections::VecDeque;

/// Ordered queue of requirements awaiting processing.
///
/// Requirements are processed in enqueue order; the initial seed order
/// equals manifest declaration order.
#[derive(Debug, Default)]
pub struct RequirementsStore {
    queue: VecDeque<Requirement>,
}

impl RequirementsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from a materialized manifest: one requirement per
    /// top-level module in declaration order, pinning the module's
    /// current version.
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut store = Self::new();
        for module in &manifest.top_level {
            let range = module
                .version()
                .map_or_else(VersionRange::any, VersionRange::exact);
            store.add(Requirement::from_manifest(module.clone(), range));
        }
        store
    }

    /// Append a requirement at the tail.
    pub fn add(&mut self, requirement: Requirement) {
        self.queue.push_back(requirement);
    }

    /// True iff a requirement is waiting.
    #[must_use]
    pub fn has_next(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Dequeue the head requirement.
    pub fn next(&mut self) -> Option<Requirement> {
        self.queue.pop_front()
    }

    /// Number of queued requirements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True iff nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Overwrite the target version on every queued requirement whose
    /// target matches the slug, so pending requirements see a version
    /// change immediately.
    pub fn update_target_version(&mut self, slug: &Slug, version: &Version) {
        for requirement in &mut self.queue {
            if requirement.target.slug() == slug {
                requirement.target.set_version(version.clone());
            }
        }
    }

    /// Drop every queued requirement whose source module matches the
    /// slug. Used when a module's version changes and its previously
    /// discovered out-requirements become stale.
    pub fn delete_source_requirements(&mut self, slug: &Slug) {
        self.queue
            .retain(|requirement| requirement.source_slug() != Some(slug));
    }
}
