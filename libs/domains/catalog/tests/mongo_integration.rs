//! Service-level tests against a real MongoDB container.
//!
//! Run with `cargo test -p domain_catalog -- --ignored` (requires docker).

use std::sync::Arc;

use domain_catalog::models::{CreateCategory, CreateProduct, ListCategoriesQuery, UpdateCategory};
use domain_catalog::{
    CatalogError, CategoryService, MongoCategoryRepository, MongoProductRepository, ProductService,
};
use test_utils::assertions::assert_some;
use test_utils::{TestDataBuilder, TestMongo};
use uuid::Uuid;

struct Catalog {
    categories: CategoryService<MongoCategoryRepository, MongoProductRepository>,
    products: ProductService<MongoProductRepository, MongoCategoryRepository>,
}

async fn catalog(mongo: &TestMongo, test_name: &str) -> Catalog {
    let db = mongo.database(&TestDataBuilder::from_test_name(test_name).database_name());

    let category_repo = Arc::new(MongoCategoryRepository::new(&db));
    let product_repo = Arc::new(MongoProductRepository::new(&db));
    category_repo.init_indexes().await.unwrap();
    product_repo.init_indexes().await.unwrap();

    Catalog {
        categories: CategoryService::new(category_repo.clone(), product_repo.clone()),
        products: ProductService::new(product_repo, category_repo),
    }
}

fn category(name: &str, parent: Option<Uuid>) -> CreateCategory {
    CreateCategory {
        name: name.to_string(),
        slug: None,
        description: String::new(),
        parent,
        is_active: true,
        image: None,
    }
}

fn product(name: &str, category: Option<Uuid>) -> CreateProduct {
    CreateProduct {
        name: name.to_string(),
        slug: None,
        description: String::new(),
        price: 1999,
        images: Vec::new(),
        is_active: true,
        is_featured: false,
        category,
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_tree_lifecycle() {
    let mongo = TestMongo::new().await;
    let catalog = catalog(&mongo, "test_tree_lifecycle").await;

    let apparel = catalog
        .categories
        .create_category(category("Apparel", None))
        .await
        .unwrap();
    let shoes = catalog
        .categories
        .create_category(category("Shoes", Some(apparel.id)))
        .await
        .unwrap();
    let trail = catalog
        .categories
        .create_category(category("Trail", Some(shoes.id)))
        .await
        .unwrap();
    assert_eq!(trail.level, 2);
    assert_eq!(trail.ancestors, vec![apparel.id, shoes.id]);

    let fetched = catalog
        .categories
        .get_category("shoes", false)
        .await
        .unwrap();
    assert_eq!(assert_some(fetched.parent, "shoes parent").id, apparel.id);
    assert_eq!(fetched.children.len(), 1);

    let roots = catalog
        .categories
        .list_categories(ListCategoriesQuery {
            parent: Some("null".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(roots.pagination.total_items, 1);

    // Move Shoes to the root; Trail follows
    let moved = catalog
        .categories
        .update_category(
            shoes.id,
            UpdateCategory {
                parent: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.level, 0);
    // Creating Trail under Shoes bumped it once already
    assert_eq!(moved.version, 2);

    let trail = catalog
        .categories
        .get_category(&trail.id.to_string(), false)
        .await
        .unwrap();
    assert_eq!(trail.level, 1);
    assert_eq!(trail.ancestors, vec![shoes.id]);

    let tree = catalog.categories.hierarchy(false).await.unwrap();
    assert_eq!(tree.len(), 2);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_cycle_and_duplicates_are_rejected() {
    let mongo = TestMongo::new().await;
    let catalog = catalog(&mongo, "test_cycle_and_duplicates_are_rejected").await;

    let root = catalog
        .categories
        .create_category(category("Root", None))
        .await
        .unwrap();
    let child = catalog
        .categories
        .create_category(category("Child", Some(root.id)))
        .await
        .unwrap();

    let err = catalog
        .categories
        .update_category(
            root.id,
            UpdateCategory {
                parent: Some(Some(child.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::CircularReference));

    let err = catalog
        .categories
        .create_category(category("Child", Some(root.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateName(_)));

    let stale = catalog
        .categories
        .update_category(
            child.id,
            UpdateCategory {
                description: Some("stale".to_string()),
                version: Some(7),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(stale, CatalogError::ConcurrentModification(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_force_delete_unlinks_products() {
    let mongo = TestMongo::new().await;
    let catalog = catalog(&mongo, "test_force_delete_unlinks_products").await;

    let root = catalog
        .categories
        .create_category(category("Root", None))
        .await
        .unwrap();
    let leaf = catalog
        .categories
        .create_category(category("Leaf", Some(root.id)))
        .await
        .unwrap();
    let runner = catalog
        .products
        .create_product(product("Runner", Some(leaf.id)))
        .await
        .unwrap();

    let leaf_view = catalog
        .categories
        .get_category(&leaf.id.to_string(), true)
        .await
        .unwrap();
    assert_eq!(leaf_view.product_count, 1);
    assert_eq!(assert_some(leaf_view.products, "embedded products").len(), 1);

    let err = catalog
        .categories
        .delete_category(root.id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::HasChildren(1)));

    let result = catalog
        .categories
        .delete_category(root.id, true)
        .await
        .unwrap();
    assert_eq!(result.deleted_categories, 2);
    assert_eq!(result.unlinked_products, 1);

    let runner = catalog
        .products
        .get_product(&runner.id.to_string())
        .await
        .unwrap();
    assert_eq!(runner.category, None);
}
