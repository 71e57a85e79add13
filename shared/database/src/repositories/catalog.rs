//! Catalog Repository
//!
//! Resolve-or-create for reference entities by natural key. Existing
//! entities are returned unchanged; nothing is ever merged into them.

use std::sync::Arc;

use mongodb::bson::{self, doc, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use spk_models::{Area, Category, GeoPoint, RatePair, SubCategory, Unit, WorkItem};
use spk_utils::{validate_model, SpkResult};

use crate::store::{collections, DocumentStore};

/// An entity identified by a natural key inside its own collection.
pub trait CatalogEntity: Serialize + DeserializeOwned + Validate + Send + Sync {
    const COLLECTION: &'static str;

    /// Equality filter over the natural key fields.
    fn natural_key(&self) -> SpkResult<Document>;
}

impl CatalogEntity for Category {
    const COLLECTION: &'static str = collections::CATEGORIES;

    fn natural_key(&self) -> SpkResult<Document> {
        Ok(doc! { "name": self.name.as_str() })
    }
}

impl CatalogEntity for SubCategory {
    const COLLECTION: &'static str = collections::SUB_CATEGORIES;

    fn natural_key(&self) -> SpkResult<Document> {
        Ok(doc! { "name": self.name.as_str(), "categoryId": bson::to_bson(&self.category_id)? })
    }
}

impl CatalogEntity for Unit {
    const COLLECTION: &'static str = collections::UNITS;

    fn natural_key(&self) -> SpkResult<Document> {
        Ok(doc! { "name": self.name.as_str() })
    }
}

impl CatalogEntity for Area {
    const COLLECTION: &'static str = collections::AREAS;

    fn natural_key(&self) -> SpkResult<Document> {
        Ok(doc! { "name": self.name.as_str() })
    }
}

impl CatalogEntity for WorkItem {
    const COLLECTION: &'static str = collections::WORK_ITEMS;

    fn natural_key(&self) -> SpkResult<Document> {
        Ok(doc! { "name": self.name.as_str() })
    }
}

/// A resolved entity and whether this call created it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<E> {
    pub entity: E,
    pub created: bool,
}

pub struct CatalogRepository {
    store: Arc<dyn DocumentStore>,
}

impl CatalogRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Look up `candidate`'s natural key; insert `candidate` if absent.
    /// Invalid candidates are rejected before the store is touched.
    pub async fn resolve<E: CatalogEntity>(&self, candidate: E) -> SpkResult<Resolved<E>> {
        validate_model(&candidate)?;
        let filter = candidate.natural_key()?;
        let document = bson::to_document(&candidate)?;

        let (stored, created) = self.store.find_or_insert(E::COLLECTION, filter, document).await?;
        if created {
            info!(collection = E::COLLECTION, "Created catalog entity");
        }

        Ok(Resolved {
            entity: bson::from_document(stored)?,
            created,
        })
    }

    pub async fn category(&self, name: &str) -> SpkResult<Resolved<Category>> {
        self.resolve(Category::new(name)).await
    }

    pub async fn sub_category(&self, name: &str, category_id: Uuid) -> SpkResult<Resolved<SubCategory>> {
        self.resolve(SubCategory::new(name, category_id)).await
    }

    pub async fn unit(&self, name: &str) -> SpkResult<Resolved<Unit>> {
        self.resolve(Unit::new(name)).await
    }

    /// Areas created here get `placeholder` as their location.
    pub async fn area(&self, name: &str, placeholder: GeoPoint) -> SpkResult<Resolved<Area>> {
        self.resolve(Area::new(name, placeholder)).await
    }

    pub async fn work_item(
        &self,
        name: &str,
        category_id: Uuid,
        sub_category_id: Uuid,
        unit_id: Uuid,
        rates: RatePair,
    ) -> SpkResult<Resolved<WorkItem>> {
        self.resolve(WorkItem::new(name, category_id, sub_category_id, unit_id, rates))
            .await
    }

    pub async fn count<E: CatalogEntity>(&self) -> SpkResult<u64> {
        self.store.count(E::COLLECTION, Document::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::migrations::ensure_indexes;
    use proptest::prelude::*;
    use spk_models::Rate;

    async fn repository() -> CatalogRepository {
        let store = MemoryStore::new();
        ensure_indexes(&store).await.unwrap();
        CatalogRepository::new(Arc::new(store))
    }

    fn rates(nr: f64, r: f64) -> RatePair {
        RatePair::new(Rate::new(nr, "Non-Remote"), Rate::new(r, "Remote"))
    }

    #[tokio::test]
    async fn test_resolve_twice_returns_same_id() {
        let repo = repository().await;

        let first = repo.category("Earthworks").await.unwrap();
        let second = repo.category("Earthworks").await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.entity.id, second.entity.id);
        assert_eq!(repo.count::<Category>().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sub_category_key_includes_category() {
        let repo = repository().await;
        let earthworks = repo.category("Earthworks").await.unwrap().entity;
        let concrete = repo.category("Concrete").await.unwrap().entity;

        let a = repo.sub_category("General", earthworks.id).await.unwrap();
        let b = repo.sub_category("General", concrete.id).await.unwrap();
        let c = repo.sub_category("General", earthworks.id).await.unwrap();

        assert_ne!(a.entity.id, b.entity.id);
        assert_eq!(a.entity.id, c.entity.id);
        assert_eq!(c.entity.category_id, earthworks.id);
        assert_eq!(repo.count::<SubCategory>().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_existing_work_item_is_not_modified() {
        let repo = repository().await;
        let (cat, sub, unit) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let original = repo
            .work_item("Excavate trench", cat, sub, unit, rates(50_000.0, 60_000.0))
            .await
            .unwrap();
        let again = repo
            .work_item("Excavate trench", cat, sub, unit, rates(55_000.0, 65_000.0))
            .await
            .unwrap();

        assert!(!again.created);
        assert_eq!(again.entity.id, original.entity.id);
        assert_eq!(again.entity.rates, rates(50_000.0, 60_000.0));
    }

    #[tokio::test]
    async fn test_area_gets_placeholder_location() {
        let repo = repository().await;

        let area = repo.area("Cikarang", GeoPoint::new(0.0, 0.0)).await.unwrap();

        assert_eq!(area.entity.name, "Cikarang");
        assert_eq!(area.entity.location.kind, "Point");
        assert_eq!(area.entity.location.coordinates, [0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_invalid_candidate_is_not_stored() {
        let repo = repository().await;

        let result = repo.unit(&"m".repeat(80)).await;

        assert!(matches!(result, Err(spk_utils::SpkError::Validation { .. })));
        assert_eq!(repo.count::<Unit>().await.unwrap(), 0);
    }

    proptest! {
        /// One unit per distinct name, however often each name repeats.
        #[test]
        fn prop_units_deduplicate(names in prop::collection::vec("[a-z]{1,3}", 1..30)) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let (count, distinct) = runtime.block_on(async {
                let repo = repository().await;
                for name in &names {
                    repo.unit(name).await.unwrap();
                }
                let distinct = names.iter().collect::<std::collections::HashSet<_>>().len();
                (repo.count::<Unit>().await.unwrap(), distinct)
            });
            prop_assert_eq!(count, distinct as u64);
        }
    }
}
