//! In-memory record store
//!
//! Reference implementations of the collaborator traits, used by the
//! pipeline tests and by single-node deployments that have not wired a
//! real database yet. The null-preserving upsert semantics here are the
//! normative behavior a persistent implementation must match.

use super::repository::{
    canonical_amazon_url, ImportHistoryStore, Product, ProductRepository, ProductUpsert, TagStore,
    UpsertCounts,
};
use crate::core::eligibility::types::{CheckMode, SellingStatus};
use crate::core::import::types::{ImportOutcome, RowError};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Mutex-guarded product map keyed by ASIN
#[derive(Default)]
pub struct MemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
    /// Insertion counter preserving creation order for `Recent`
    order: RwLock<Vec<String>>,
}

impl MemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a stored product (test helper)
    pub async fn get(&self, asin: &str) -> Option<Product> {
        self.products.read().await.get(asin).cloned()
    }

    fn merge(existing: &mut Product, incoming: &ProductUpsert, now: DateTime<Utc>) {
        // Only non-null incoming fields overwrite stored values.
        macro_rules! keep_or_set {
            ($field:ident) => {
                if incoming.$field.is_some() {
                    existing.$field = incoming.$field.clone();
                }
            };
        }
        keep_or_set!(title);
        keep_or_set!(brand);
        keep_or_set!(category);
        keep_or_set!(image_url);
        keep_or_set!(price);
        keep_or_set!(buy_box_price);
        keep_or_set!(fba_fee);
        keep_or_set!(referral_fee);
        keep_or_set!(rating);
        keep_or_set!(monthly_revenue);
        keep_or_set!(bsr);
        keep_or_set!(review_count);
        keep_or_set!(seller_count);
        keep_or_set!(monthly_sales);
        keep_or_set!(fulfillment);
        if let Some(url) = &incoming.amazon_url {
            existing.amazon_url = url.clone();
        }
        existing.updated_at = now;
    }

    fn create(incoming: &ProductUpsert, now: DateTime<Utc>) -> Product {
        Product {
            asin: incoming.asin.clone(),
            title: incoming.title.clone(),
            brand: incoming.brand.clone(),
            category: incoming.category.clone(),
            image_url: incoming.image_url.clone(),
            amazon_url: incoming
                .amazon_url
                .clone()
                .unwrap_or_else(|| canonical_amazon_url(&incoming.asin)),
            price: incoming.price,
            buy_box_price: incoming.buy_box_price,
            fba_fee: incoming.fba_fee,
            referral_fee: incoming.referral_fee,
            rating: incoming.rating,
            monthly_revenue: incoming.monthly_revenue,
            bsr: incoming.bsr,
            review_count: incoming.review_count,
            seller_count: incoming.seller_count,
            monthly_sales: incoming.monthly_sales,
            fulfillment: incoming.fulfillment.clone(),
            selling_status: None,
            checked_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl ProductRepository for MemoryProductRepository {
    async fn upsert_batch(&self, records: &[ProductUpsert]) -> Result<UpsertCounts> {
        let mut products = self.products.write().await;
        let mut order = self.order.write().await;
        let mut counts = UpsertCounts::default();
        let now = Utc::now();

        for record in records {
            match products.get_mut(&record.asin) {
                Some(existing) => {
                    Self::merge(existing, record, now);
                    counts.updated += 1;
                }
                None => {
                    products.insert(record.asin.clone(), Self::create(record, now));
                    order.push(record.asin.clone());
                    counts.inserted += 1;
                }
            }
        }
        Ok(counts)
    }

    async fn find_asins_by_mode(&self, mode: &CheckMode) -> Result<Vec<String>> {
        let products = self.products.read().await;
        let order = self.order.read().await;

        let asins = match mode {
            CheckMode::NotChecked => order
                .iter()
                .filter(|asin| {
                    products
                        .get(*asin)
                        .map(|p| p.checked_at.is_none())
                        .unwrap_or(false)
                })
                .cloned()
                .collect(),
            CheckMode::WithStatus(status) => order
                .iter()
                .filter(|asin| {
                    products
                        .get(*asin)
                        .map(|p| p.selling_status == Some(*status))
                        .unwrap_or(false)
                })
                .cloned()
                .collect(),
            CheckMode::Recent(n) => order.iter().rev().take(*n).cloned().collect(),
        };
        Ok(asins)
    }

    async fn selling_statuses(
        &self,
        asins: &[String],
    ) -> Result<Vec<(String, Option<SellingStatus>)>> {
        let products = self.products.read().await;
        Ok(asins
            .iter()
            .filter_map(|asin| {
                products
                    .get(asin)
                    .map(|p| (asin.clone(), p.selling_status))
            })
            .collect())
    }

    async fn update_selling_status(
        &self,
        asin: &str,
        status: SellingStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut products = self.products.write().await;
        if let Some(product) = products.get_mut(asin) {
            product.selling_status = Some(status);
            product.checked_at = Some(checked_at);
            product.updated_at = checked_at;
        }
        Ok(())
    }
}

/// In-memory tag store
#[derive(Default)]
pub struct MemoryTagStore {
    tags: RwLock<HashMap<(String, String), String>>,
    associations: RwLock<HashSet<(String, String)>>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a product carries a tag (test helper)
    pub async fn is_associated(&self, asin: &str, tag_id: &str) -> bool {
        self.associations
            .read()
            .await
            .contains(&(asin.to_string(), tag_id.to_string()))
    }
}

#[async_trait]
impl TagStore for MemoryTagStore {
    async fn get_or_create_tag(&self, name: &str, kind: &str) -> Result<String> {
        let key = (name.to_string(), kind.to_string());
        let mut tags = self.tags.write().await;
        let next_id = format!("tag-{}", tags.len() + 1);
        Ok(tags.entry(key).or_insert(next_id).clone())
    }

    async fn associate(&self, asin: &str, tag_id: &str) -> Result<()> {
        let mut associations = self.associations.write().await;
        // Duplicate associations are silently absorbed.
        associations.insert((asin.to_string(), tag_id.to_string()));
        Ok(())
    }
}

/// In-memory import history
#[derive(Default)]
pub struct MemoryImportHistoryStore {
    imports: RwLock<Vec<ImportOutcome>>,
    artifacts: RwLock<HashMap<String, Vec<RowError>>>,
}

impl MemoryImportHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded imports (test helper)
    pub async fn import_count(&self) -> usize {
        self.imports.read().await.len()
    }

    /// Stored overflow errors for a job (test helper)
    pub async fn artifact(&self, artifact_id: &str) -> Option<Vec<RowError>> {
        self.artifacts.read().await.get(artifact_id).cloned()
    }
}

#[async_trait]
impl ImportHistoryStore for MemoryImportHistoryStore {
    async fn record_import(&self, outcome: &ImportOutcome) -> Result<()> {
        self.imports.write().await.push(outcome.clone());
        Ok(())
    }

    async fn store_error_artifact(&self, job_id: &str, errors: &[RowError]) -> Result<String> {
        let artifact_id = format!("import-errors-{}", job_id);
        self.artifacts
            .write()
            .await
            .insert(artifact_id.clone(), errors.to_vec());
        Ok(artifact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(asin: &str) -> ProductUpsert {
        ProductUpsert {
            asin: asin.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let repo = MemoryProductRepository::new();

        let first = repo.upsert_batch(&[upsert("B000000001")]).await.unwrap();
        assert_eq!(first, UpsertCounts { inserted: 1, updated: 0 });

        let second = repo.upsert_batch(&[upsert("B000000001")]).await.unwrap();
        assert_eq!(second, UpsertCounts { inserted: 0, updated: 1 });
    }

    #[tokio::test]
    async fn test_null_preserving_merge() {
        let repo = MemoryProductRepository::new();

        let mut full = upsert("B000000001");
        full.title = Some("Widget".to_string());
        full.price = Some(19.99);
        full.review_count = Some(120);
        repo.upsert_batch(&[full]).await.unwrap();

        // Second import omits price and review_count but renames the title.
        let mut partial = upsert("B000000001");
        partial.title = Some("Widget v2".to_string());
        repo.upsert_batch(&[partial]).await.unwrap();

        let stored = repo.get("B000000001").await.unwrap();
        assert_eq!(stored.title.as_deref(), Some("Widget v2"));
        assert_eq!(stored.price, Some(19.99));
        assert_eq!(stored.review_count, Some(120));
    }

    #[tokio::test]
    async fn test_amazon_url_derived_when_absent() {
        let repo = MemoryProductRepository::new();
        repo.upsert_batch(&[upsert("B07XYZ1234")]).await.unwrap();
        let stored = repo.get("B07XYZ1234").await.unwrap();
        assert_eq!(stored.amazon_url, "https://www.amazon.com/dp/B07XYZ1234");
    }

    #[tokio::test]
    async fn test_find_asins_by_mode() {
        let repo = MemoryProductRepository::new();
        repo.upsert_batch(&[upsert("B000000001"), upsert("B000000002"), upsert("B000000003")])
            .await
            .unwrap();

        repo.update_selling_status("B000000002", SellingStatus::Gated, Utc::now())
            .await
            .unwrap();

        let unchecked = repo.find_asins_by_mode(&CheckMode::NotChecked).await.unwrap();
        assert_eq!(unchecked, vec!["B000000001", "B000000003"]);

        let gated = repo
            .find_asins_by_mode(&CheckMode::WithStatus(SellingStatus::Gated))
            .await
            .unwrap();
        assert_eq!(gated, vec!["B000000002"]);

        let recent = repo.find_asins_by_mode(&CheckMode::Recent(2)).await.unwrap();
        assert_eq!(recent, vec!["B000000003", "B000000002"]);
    }

    #[tokio::test]
    async fn test_tag_store_idempotent() {
        let tags = MemoryTagStore::new();
        let id1 = tags.get_or_create_tag("Amazon", "seller").await.unwrap();
        let id2 = tags.get_or_create_tag("Amazon", "seller").await.unwrap();
        assert_eq!(id1, id2);

        tags.associate("B000000001", &id1).await.unwrap();
        tags.associate("B000000001", &id1).await.unwrap();
        assert!(tags.is_associated("B000000001", &id1).await);
    }
}
