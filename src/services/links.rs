//! Link creation and listing.

use tracing::debug;

use super::random_alphanumeric;
use crate::domain::{Link, LinkRepository, StoreError};

const SLUG_LENGTH: usize = 10;

/// Input for creating a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLink {
    pub owner_user_id: i64,
    pub label: String,
    pub prompt: Option<String>,
}

/// Creates a link under a fresh random slug.
pub struct CreateLinkService<'a> {
    links: &'a dyn LinkRepository,
}

impl<'a> CreateLinkService<'a> {
    pub fn new(links: &'a dyn LinkRepository) -> Self {
        Self { links }
    }

    pub async fn execute(&self, input: &CreateLink) -> Result<Link, StoreError> {
        let mut slug = random_alphanumeric(SLUG_LENGTH);
        while self.links.exists_slug(&slug).await? {
            debug!("Slug collision on {}, regenerating", slug);
            slug = random_alphanumeric(SLUG_LENGTH);
        }
        self.links
            .create(
                input.owner_user_id,
                &slug,
                &input.label,
                input.prompt.as_deref(),
            )
            .await
    }
}

/// Lists the links of an owner.
pub struct ListLinksService<'a> {
    links: &'a dyn LinkRepository,
}

impl<'a> ListLinksService<'a> {
    pub fn new(links: &'a dyn LinkRepository) -> Self {
        Self { links }
    }

    pub async fn execute(&self, owner_user_id: i64) -> Result<Vec<Link>, StoreError> {
        self.links.list_by_owner(owner_user_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::storage::memory::MemoryStore;

    #[tokio::test]
    async fn test_create_link_generates_slug() {
        let store = MemoryStore::new();
        let link = CreateLinkService::new(&store)
            .execute(&CreateLink {
                owner_user_id: 1,
                label: "Test".to_owned(),
                prompt: None,
            })
            .await
            .unwrap();

        assert_eq!(link.slug.len(), SLUG_LENGTH);
        assert!(link.slug.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(link.owner_user_id, 1);
        assert!(link.is_active);
    }

    #[tokio::test]
    async fn test_list_skips_deleted_links() {
        let store = MemoryStore::new();
        let service = CreateLinkService::new(&store);
        let input = CreateLink {
            owner_user_id: 7,
            label: "Mine".to_owned(),
            prompt: Some("Say something nice".to_owned()),
        };
        let kept = service.execute(&input).await.unwrap();
        let mut deleted = service.execute(&input).await.unwrap();
        deleted.deleted_at = Some(Utc::now());
        store.put_link(deleted).await;

        let links = ListLinksService::new(&store).execute(7).await.unwrap();
        assert_eq!(links, vec![kept]);
    }
}
