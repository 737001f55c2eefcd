use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use dashmap::DashMap;
use hub_primitives::{User, DEFAULT_TAG};
use hub_repository::TagRepository;

/// Hard ceiling on ancestor-walk depth, on top of the cycle-guard visited
/// set — a forest deeper than this almost certainly indicates corrupt data
/// rather than a legitimate hierarchy.
const MAX_WALK_DEPTH: usize = 256;

const CACHE_TTL: StdDuration = StdDuration::from_secs(24 * 3600);

struct CacheEntry {
    tags: HashSet<String>,
    cached_at: Instant,
}

/// Expands a user's assigned tags into the effective tag set (transitive
/// ancestors plus `DEFAULT`), memoizing per user with a 24h sliding TTL.
///
/// On any repository error the resolver falls back to `{DEFAULT}` rather
/// than propagating (spec.md §4.1) and does not poison the cache with the
/// fallback value, so a subsequent call retries against the repository.
pub struct TagResolver<R: TagRepository> {
    tags: Arc<R>,
    cache: DashMap<i64, CacheEntry>,
}

impl<R: TagRepository> TagResolver<R> {
    pub fn new(tags: Arc<R>) -> Self {
        Self {
            tags,
            cache: DashMap::new(),
        }
    }

    /// The effective tag set for `user`. Always contains `DEFAULT`.
    pub async fn effective_tags(&self, user: &User) -> HashSet<String> {
        if let Some(mut entry) = self.cache.get_mut(&user.id) {
            if entry.cached_at.elapsed() < CACHE_TTL {
                entry.cached_at = Instant::now(); // sliding TTL
                return entry.tags.clone();
            }
        }

        match self.materialize(user).await {
            Ok(tags) => {
                self.cache.insert(
                    user.id,
                    CacheEntry {
                        tags: tags.clone(),
                        cached_at: Instant::now(),
                    },
                );
                tags
            }
            Err(_) => {
                let mut fallback = HashSet::new();
                fallback.insert(DEFAULT_TAG.to_string());
                fallback
            }
        }
    }

    async fn materialize(&self, user: &User) -> Result<HashSet<String>, hub_repository::RepositoryError> {
        let mut effective: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = user.assigned_tags.iter().cloned().collect();
        let mut depth = 0usize;

        while let Some(tag_id) = queue.pop_front() {
            if depth >= MAX_WALK_DEPTH {
                break;
            }
            // Byte-exact comparison by design — see spec.md §9.
            if !visited.insert(tag_id.clone()) {
                continue;
            }
            effective.insert(tag_id.clone());
            if let Some(tag) = self.tags.find(&tag_id).await? {
                if let Some(parent) = tag.parent_id {
                    queue.push_back(parent);
                }
            }
            depth += 1;
        }

        effective.insert(DEFAULT_TAG.to_string());
        Ok(effective)
    }

    /// Invalidate the cached entry for a single user — called when an admin
    /// reassigns that user's tags.
    pub fn invalidate_user(&self, user_id: i64) {
        self.cache.remove(&user_id);
    }

    /// Invalidate every cached entry — called when an admin creates,
    /// updates, or deletes any `OrganizationTag`.
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_primitives::{OrganizationTag, Role};
    use hub_repository::memory::InMemoryRepository;
    use hub_repository::TagRepository as _;

    fn user_with_tags(tags: &[&str]) -> User {
        User {
            id: 1,
            login: "alice".into(),
            hashed_secret: "x".into(),
            role: Role::User,
            assigned_tags: tags.iter().map(|s| s.to_string()).collect(),
            primary_tag: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn effective_set_always_contains_default() {
        let repo = Arc::new(InMemoryRepository::new());
        let resolver = TagResolver::new(repo);
        let user = user_with_tags(&[]);
        let effective = resolver.effective_tags(&user).await;
        assert!(effective.contains(DEFAULT_TAG));
    }

    #[tokio::test]
    async fn expands_ancestor_chain() {
        let repo = Arc::new(InMemoryRepository::new());
        TagRepository::insert(&*repo, OrganizationTag::new("root".into(), "Root".into(), 1, None))
            .await
            .unwrap();
        TagRepository::insert(
            &*repo,
            OrganizationTag::new("mid".into(), "Mid".into(), 1, Some("root".into())),
        )
        .await
        .unwrap();
        TagRepository::insert(
            &*repo,
            OrganizationTag::new("leaf".into(), "Leaf".into(), 1, Some("mid".into())),
        )
        .await
        .unwrap();

        let resolver = TagResolver::new(repo);
        let user = user_with_tags(&["leaf"]);
        let effective = resolver.effective_tags(&user).await;
        assert_eq!(
            effective,
            ["leaf", "mid", "root", DEFAULT_TAG]
                .iter()
                .map(|s| s.to_string())
                .collect()
        );
    }

    #[tokio::test]
    async fn cycle_guard_terminates() {
        let repo = Arc::new(InMemoryRepository::new());
        TagRepository::insert(
            &*repo,
            OrganizationTag::new("a".into(), "A".into(), 1, Some("b".into())),
        )
        .await
        .unwrap();
        TagRepository::insert(
            &*repo,
            OrganizationTag::new("b".into(), "B".into(), 1, Some("a".into())),
        )
        .await
        .unwrap();

        let resolver = TagResolver::new(repo);
        let user = user_with_tags(&["a"]);
        let effective = resolver.effective_tags(&user).await;
        assert_eq!(
            effective,
            ["a", "b", DEFAULT_TAG].iter().map(|s| s.to_string()).collect()
        );
    }

    #[tokio::test]
    async fn invalidate_user_forces_recompute() {
        let repo = Arc::new(InMemoryRepository::new());
        let resolver = TagResolver::new(Arc::clone(&repo));
        let user = user_with_tags(&["leaf"]);
        let first = resolver.effective_tags(&user).await;
        assert!(first.contains("leaf")); // assigned tag present even before the row exists
        TagRepository::insert(&*repo, OrganizationTag::new("leaf".into(), "Leaf".into(), 1, Some("root".into())))
            .await
            .unwrap();
        resolver.invalidate_user(user.id);
        let second = resolver.effective_tags(&user).await;
        assert!(second.contains("root"));
    }
}
