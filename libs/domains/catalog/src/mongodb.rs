//! MongoDB implementations of the catalog repositories

use async_trait::async_trait;
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, spec::BinarySubtype, to_bson, Binary, Bson, Document},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::CatalogResult;
use crate::models::{
    BulkCategoryChanges, BulkUpdateResult, Category, CategoryFilter, ParentFilter, Product,
    ProductFilter, ProductSummary,
};
use crate::pagination::Sort;
use crate::repository::{CategoryRepository, ProductRepository};

pub const CATEGORIES_COLLECTION: &str = "categories";
pub const PRODUCTS_COLLECTION: &str = "products";

/// UUIDs as the driver's document serializer writes them: generic binary
fn id_bson(id: &Uuid) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Generic,
        bytes: id.as_bytes().to_vec(),
    })
}

fn ids_bson(ids: &[Uuid]) -> Bson {
    Bson::Array(ids.iter().map(id_bson).collect())
}

/// Timestamp in the same representation serde gives `DateTime<Utc>` fields
fn now_bson() -> Bson {
    to_bson(&Utc::now()).unwrap_or(Bson::Null)
}

fn sort_document(sort: Sort) -> Document {
    let mut document = Document::new();
    document.insert(sort.field, sort.order.direction());
    document.insert("_id", 1);
    document
}

/// Case-insensitive `$or` over name and description; regex metacharacters
/// in `search` are matched literally
fn search_clause(search: &str) -> Bson {
    let pattern = regex::escape(search);
    Bson::Array(vec![
        Bson::Document(doc! { "name": { "$regex": pattern.as_str(), "$options": "i" } }),
        Bson::Document(doc! { "description": { "$regex": pattern.as_str(), "$options": "i" } }),
    ])
}

fn index(keys: Document, name: &str, unique: bool) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(unique)
                .name(name.to_string())
                .build(),
        )
        .build()
}

pub struct MongoCategoryRepository {
    collection: Collection<Category>,
}

impl MongoCategoryRepository {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, CATEGORIES_COLLECTION)
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection::<Category>(collection_name);
        Self { collection }
    }

    /// Create the indexes the uniqueness rules and tree queries rely on
    pub async fn init_indexes(&self) -> CatalogResult<()> {
        let indexes = vec![
            index(doc! { "slug": 1 }, "idx_slug_unique", true),
            index(doc! { "parent": 1, "name": 1 }, "idx_parent_name_unique", true),
            index(doc! { "ancestors": 1 }, "idx_ancestors", false),
            index(doc! { "level": 1, "name": 1 }, "idx_level_name", false),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Category indexes created successfully");
        Ok(())
    }

    fn build_filter(filter: &CategoryFilter) -> Document {
        let mut doc = doc! {};

        match filter.parent {
            Some(ParentFilter::Root) => {
                doc.insert("parent", Bson::Null);
            }
            Some(ParentFilter::Id(id)) => {
                doc.insert("parent", id_bson(&id));
            }
            None => {}
        }

        if let Some(level) = filter.level {
            doc.insert("level", level as i64);
        }

        if let Some(is_active) = filter.is_active {
            doc.insert("isActive", is_active);
        }

        if let Some(ref search) = filter.search {
            doc.insert("$or", search_clause(search));
        }

        doc
    }

    async fn find_many(&self, filter: Document, sort: Document) -> CatalogResult<Vec<Category>> {
        let options = FindOptions::builder().sort(sort).build();
        let cursor = self.collection.find(filter).with_options(options).await?;
        let categories: Vec<Category> = cursor.try_collect().await?;
        Ok(categories)
    }
}

#[async_trait]
impl CategoryRepository for MongoCategoryRepository {
    #[instrument(skip(self, category), fields(category_id = %category.id))]
    async fn insert(&self, category: &Category) -> CatalogResult<()> {
        self.collection.insert_one(category).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Category>> {
        let category = self.collection.find_one(doc! { "_id": id_bson(&id) }).await?;
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn find_by_slug(&self, slug: &str) -> CatalogResult<Option<Category>> {
        let category = self.collection.find_one(doc! { "slug": slug }).await?;
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn find_by_ids(&self, ids: Vec<Uuid>) -> CatalogResult<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_many(doc! { "_id": { "$in": ids_bson(&ids) } }, doc! { "name": 1 })
            .await
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: CategoryFilter,
        sort: Sort,
        skip: u64,
        limit: u64,
    ) -> CatalogResult<Vec<Category>> {
        let options = FindOptions::builder()
            .sort(sort_document(sort))
            .skip(skip)
            .limit(limit as i64)
            .build();

        let cursor = self
            .collection
            .find(Self::build_filter(&filter))
            .with_options(options)
            .await?;
        let categories: Vec<Category> = cursor.try_collect().await?;

        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: CategoryFilter) -> CatalogResult<u64> {
        let count = self
            .collection
            .count_documents(Self::build_filter(&filter))
            .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn name_taken(
        &self,
        name: String,
        parent: Option<Uuid>,
        exclude: Option<Uuid>,
    ) -> CatalogResult<bool> {
        let mut filter = doc! {
            "name": name,
            "parent": parent.as_ref().map(id_bson).unwrap_or(Bson::Null),
        };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id_bson(&id) });
        }

        let count = self.collection.count_documents(filter).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn slug_taken(&self, slug: String, exclude: Option<Uuid>) -> CatalogResult<bool> {
        let mut filter = doc! { "slug": slug };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id_bson(&id) });
        }

        let count = self.collection.count_documents(filter).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn count_children(&self, id: Uuid) -> CatalogResult<u64> {
        let count = self
            .collection
            .count_documents(doc! { "parent": id_bson(&id) })
            .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn find_children(&self, parent_ids: Vec<Uuid>) -> CatalogResult<Vec<Category>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_many(
            doc! { "parent": { "$in": ids_bson(&parent_ids) } },
            doc! { "name": 1 },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_descendants(&self, id: Uuid) -> CatalogResult<Vec<Category>> {
        self.find_many(doc! { "ancestors": id_bson(&id) }, doc! { "level": 1 })
            .await
    }

    #[instrument(skip(self, category), fields(category_id = %category.id))]
    async fn replace_versioned(
        &self,
        category: &Category,
        expected_version: u64,
    ) -> CatalogResult<bool> {
        let filter = doc! {
            "_id": id_bson(&category.id),
            "version": expected_version as i64,
        };
        let result = self.collection.replace_one(filter, category).await?;
        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self))]
    async fn touch_version(&self, id: Uuid, expected_version: u64) -> CatalogResult<bool> {
        let filter = doc! {
            "_id": id_bson(&id),
            "version": expected_version as i64,
        };
        let result = self
            .collection
            .update_one(filter, doc! { "$inc": { "version": 1_i64 } })
            .await?;
        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self, ancestors))]
    async fn set_lineage(&self, id: Uuid, ancestors: Vec<Uuid>, level: u32) -> CatalogResult<()> {
        let update = doc! {
            "$set": {
                "ancestors": ids_bson(&ancestors),
                "level": level as i64,
                "updatedAt": now_bson(),
            },
            "$inc": { "version": 1_i64 },
        };
        self.collection
            .update_one(doc! { "_id": id_bson(&id) }, update)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_many(&self, ids: Vec<Uuid>) -> CatalogResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection
            .delete_many(doc! { "_id": { "$in": ids_bson(&ids) } })
            .await?;
        Ok(result.deleted_count)
    }

    #[instrument(skip(self))]
    async fn find_all(&self, include_inactive: bool) -> CatalogResult<Vec<Category>> {
        let filter = if include_inactive {
            doc! {}
        } else {
            doc! { "isActive": true }
        };
        self.find_many(filter, doc! { "level": 1, "name": 1 }).await
    }

    #[instrument(skip(self))]
    async fn find_by_level(
        &self,
        level: u32,
        include_inactive: bool,
    ) -> CatalogResult<Vec<Category>> {
        let mut filter = doc! { "level": level as i64 };
        if !include_inactive {
            filter.insert("isActive", true);
        }
        self.find_many(filter, doc! { "name": 1 }).await
    }

    #[instrument(skip(self))]
    async fn set_image(&self, id: Uuid, image: Option<String>) -> CatalogResult<Option<Category>> {
        let update = doc! {
            "$set": { "image": image, "updatedAt": now_bson() },
            "$inc": { "version": 1_i64 },
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let category = self
            .collection
            .find_one_and_update(doc! { "_id": id_bson(&id) }, update)
            .with_options(options)
            .await?;
        Ok(category)
    }

    /// Single `update_many` with an aggregation pipeline so that `version`
    /// and `updatedAt` only move on documents whose values actually change.
    #[instrument(skip(self))]
    async fn bulk_update(
        &self,
        ids: Vec<Uuid>,
        changes: BulkCategoryChanges,
    ) -> CatalogResult<BulkUpdateResult> {
        let mut set = doc! {};
        let mut unchanged = Vec::new();

        if let Some(is_active) = changes.is_active {
            set.insert("isActive", is_active);
            unchanged.push(Bson::Document(doc! { "$eq": ["$isActive", is_active] }));
        }
        if let Some(ref image) = changes.image {
            set.insert("image", image.as_str());
            unchanged.push(Bson::Document(doc! { "$eq": ["$image", image.as_str()] }));
        }

        let unchanged = doc! { "$and": unchanged };
        set.insert(
            "version",
            doc! { "$cond": [unchanged.clone(), "$version", { "$add": ["$version", 1_i64] }] },
        );
        set.insert(
            "updatedAt",
            doc! { "$cond": [unchanged, "$updatedAt", now_bson()] },
        );

        let result = self
            .collection
            .update_many(
                doc! { "_id": { "$in": ids_bson(&ids) } },
                vec![doc! { "$set": set }],
            )
            .await?;

        Ok(BulkUpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    #[instrument(skip(self))]
    async fn set_product_count(&self, id: Uuid, count: u64) -> CatalogResult<()> {
        self.collection
            .update_one(
                doc! { "_id": id_bson(&id) },
                doc! { "$set": { "productCount": count as i64 } },
            )
            .await?;
        Ok(())
    }
}

pub struct MongoProductRepository {
    collection: Collection<Product>,
}

impl MongoProductRepository {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, PRODUCTS_COLLECTION)
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection::<Product>(collection_name);
        Self { collection }
    }

    pub async fn init_indexes(&self) -> CatalogResult<()> {
        let indexes = vec![
            index(doc! { "slug": 1 }, "idx_slug_unique", true),
            index(
                doc! { "category": 1, "isActive": 1 },
                "idx_category_active",
                false,
            ),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Product indexes created successfully");
        Ok(())
    }

    fn build_filter(filter: &ProductFilter) -> Document {
        let mut doc = doc! {};

        if let Some(ref category) = filter.category {
            doc.insert("category", id_bson(category));
        }

        if let Some(is_active) = filter.is_active {
            doc.insert("isActive", is_active);
        }

        if let Some(is_featured) = filter.is_featured {
            doc.insert("isFeatured", is_featured);
        }

        if let Some(ref search) = filter.search {
            doc.insert("$or", search_clause(search));
        }

        doc
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    async fn insert(&self, product: &Product) -> CatalogResult<()> {
        self.collection.insert_one(product).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        let product = self.collection.find_one(doc! { "_id": id_bson(&id) }).await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn find_by_slug(&self, slug: &str) -> CatalogResult<Option<Product>> {
        let product = self.collection.find_one(doc! { "slug": slug }).await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        filter: ProductFilter,
        sort: Sort,
        skip: u64,
        limit: u64,
    ) -> CatalogResult<Vec<Product>> {
        let options = FindOptions::builder()
            .sort(sort_document(sort))
            .skip(skip)
            .limit(limit as i64)
            .build();

        let cursor = self
            .collection
            .find(Self::build_filter(&filter))
            .with_options(options)
            .await?;
        let products: Vec<Product> = cursor.try_collect().await?;

        Ok(products)
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: ProductFilter) -> CatalogResult<u64> {
        let count = self
            .collection
            .count_documents(Self::build_filter(&filter))
            .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn slug_taken(&self, slug: String, exclude: Option<Uuid>) -> CatalogResult<bool> {
        let mut filter = doc! { "slug": slug };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id_bson(&id) });
        }

        let count = self.collection.count_documents(filter).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    async fn replace(&self, product: &Product) -> CatalogResult<bool> {
        let result = self
            .collection
            .replace_one(doc! { "_id": id_bson(&product.id) }, product)
            .await?;
        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> CatalogResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id_bson(&id) })
            .await?;
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self))]
    async fn count_by_category(&self, category: Uuid) -> CatalogResult<u64> {
        let count = self
            .collection
            .count_documents(doc! { "category": id_bson(&category) })
            .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn active_by_category(
        &self,
        category: Uuid,
        limit: i64,
    ) -> CatalogResult<Vec<ProductSummary>> {
        let options = FindOptions::builder()
            .projection(doc! {
                "_id": 1, "name": 1, "slug": 1, "price": 1, "images": 1, "isFeatured": 1,
            })
            .sort(doc! { "name": 1 })
            .limit(limit)
            .build();

        let cursor = self
            .collection
            .clone_with_type::<ProductSummary>()
            .find(doc! { "category": id_bson(&category), "isActive": true })
            .with_options(options)
            .await?;
        let products: Vec<ProductSummary> = cursor.try_collect().await?;

        Ok(products)
    }

    #[instrument(skip(self))]
    async fn unlink_categories(&self, category_ids: Vec<Uuid>) -> CatalogResult<u64> {
        if category_ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .collection
            .update_many(
                doc! { "category": { "$in": ids_bson(&category_ids) } },
                doc! { "$set": { "category": Bson::Null, "updatedAt": now_bson() } },
            )
            .await?;
        Ok(result.modified_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::SortOrder;

    #[test]
    fn test_category_filter_root_and_flags() {
        let filter = CategoryFilter {
            parent: Some(ParentFilter::Root),
            level: Some(0),
            is_active: Some(true),
            search: None,
        };
        let doc = MongoCategoryRepository::build_filter(&filter);

        assert_eq!(doc.get("parent"), Some(&Bson::Null));
        assert_eq!(doc.get_i64("level").unwrap(), 0);
        assert!(doc.get_bool("isActive").unwrap());
        assert!(!doc.contains_key("$or"));
    }

    #[test]
    fn test_category_filter_parent_id() {
        let parent = Uuid::now_v7();
        let filter = CategoryFilter {
            parent: Some(ParentFilter::Id(parent)),
            ..Default::default()
        };
        let doc = MongoCategoryRepository::build_filter(&filter);
        assert_eq!(doc.get("parent"), Some(&id_bson(&parent)));
    }

    #[test]
    fn test_search_escapes_regex_metacharacters() {
        let filter = CategoryFilter {
            search: Some("a.b*(c)".to_string()),
            ..Default::default()
        };
        let doc = MongoCategoryRepository::build_filter(&filter);

        let clauses = doc.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 2);
        let name = clauses[0].as_document().unwrap().get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), r"a\.b\*\(c\)");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_ids_are_generic_binary() {
        let id = Uuid::now_v7();
        match id_bson(&id) {
            Bson::Binary(binary) => {
                assert_eq!(binary.subtype, BinarySubtype::Generic);
                assert_eq!(binary.bytes, id.as_bytes().to_vec());
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(MongoCategoryRepository::build_filter(&CategoryFilter::default()).is_empty());
        assert!(MongoProductRepository::build_filter(&ProductFilter::default()).is_empty());
    }

    #[test]
    fn test_product_filter() {
        let category = Uuid::now_v7();
        let filter = ProductFilter {
            category: Some(category),
            is_active: Some(true),
            is_featured: Some(false),
            search: Some("shoe".to_string()),
        };
        let doc = MongoProductRepository::build_filter(&filter);

        assert_eq!(doc.get("category"), Some(&id_bson(&category)));
        assert!(doc.get_bool("isActive").unwrap());
        assert!(!doc.get_bool("isFeatured").unwrap());
        assert!(doc.contains_key("$or"));
    }

    #[test]
    fn test_sort_document_adds_id_tiebreak() {
        let doc = sort_document(Sort {
            field: "createdAt",
            order: SortOrder::Desc,
        });
        let keys: Vec<_> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["createdAt", "_id"]);
        assert_eq!(doc.get_i32("createdAt").unwrap(), -1);
    }
}
