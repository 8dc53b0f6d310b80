//! Invalidation recipes for the project domain.
//!
//! Each recipe is a fixed set of exact keys plus glob patterns derived from an
//! id. Ids are checked before any pattern is built, so a recipe only ever
//! reaches its own entity's entries. A partially failed recipe leaves stale
//! entries behind; they are bounded by their TTL and backed by the
//! authoritative store.

use tracing::debug;

use crate::cache::keys;
use crate::cache::CacheService;

impl CacheService {
    /// Evicts everything cached for one project, then everything cached for
    /// its owner's listings.
    ///
    /// Does nothing if either id is not a plain key segment.
    pub async fn invalidate_entity_cache(&self, entity_id: &str, owner_id: &str) {
        if !self.recipe_ids_valid("invalidate_entity_cache", &[entity_id, owner_id]) {
            return;
        }

        let direct = [
            keys::project(entity_id),
            keys::project_stats(entity_id),
            keys::project_documents(entity_id),
        ];
        let derived = keys::project_derived_pattern(entity_id);

        let (removed, removed_derived) =
            tokio::join!(self.del(&direct), self.delete_by_pattern(&derived));
        debug!(entity_id, removed, removed_derived, "entity cache invalidated");

        self.invalidate_owner_cache(owner_id).await;
    }

    /// Evicts an owner's paged lists, counts, sessions and aggregate.
    pub async fn invalidate_owner_cache(&self, owner_id: &str) {
        if !self.recipe_ids_valid("invalidate_owner_cache", &[owner_id]) {
            return;
        }

        let lists = keys::list_pattern(owner_id);
        let counts = keys::count_pattern(owner_id);
        let sessions = keys::session_pattern(owner_id);
        let aggregate = [keys::owner_stats(owner_id)];

        let (lists, counts, sessions, aggregate) = tokio::join!(
            self.delete_by_pattern(&lists),
            self.delete_by_pattern(&counts),
            self.delete_by_pattern(&sessions),
            self.del(&aggregate),
        );
        debug!(owner_id, lists, counts, sessions, aggregate, "owner cache invalidated");
    }

    fn recipe_ids_valid(&self, op: &'static str, ids: &[&str]) -> bool {
        ids.iter().all(|id| match keys::check_id(id, self.key_budget()) {
            Ok(()) => true,
            Err(err) => {
                self.report(op, id, &err);
                false
            }
        })
    }
}
