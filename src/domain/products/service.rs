//! Products service.

use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::{
    database::Db,
    domain::products::{
        errors::ProductsServiceError,
        models::{NewProduct, Page, Product, ProductUpdate},
        repository::{PgProductsRepository, PricingParams},
    },
};

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 40;
const MAX_PER_PAGE: u32 = 100;
const DEFAULT_AUTOCOMPLETE_LIMIT: u32 = 5;

#[derive(Debug, Clone)]
pub struct PgProductsService {
    db: Db,
    repository: PgProductsRepository,
}

impl PgProductsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgProductsRepository::new(),
        }
    }
}

/// Derive the stored pricing fields from raw inputs.
///
/// An active discount requires a discount price strictly below the list
/// price; the percentage is recorded to two decimals.
fn derive_pricing(
    price: u64,
    discount_price: Option<u64>,
    discount_active: bool,
) -> Result<PricingParams, ProductsServiceError> {
    if !discount_active {
        return Ok(PricingParams {
            price,
            discount_price,
            discount_percent: 0.0,
            discount_active: false,
        });
    }

    let discounted = discount_price.ok_or(ProductsServiceError::InvalidDiscount)?;

    if discounted >= price {
        return Err(ProductsServiceError::InvalidDiscount);
    }

    let fraction = (price - discounted) as f64 / price as f64;
    let discount_percent = (fraction * 100.0 * 100.0).round() / 100.0;

    Ok(PricingParams {
        price,
        discount_price: Some(discounted),
        discount_percent,
        discount_active: true,
    })
}

fn validate_name(name: &str) -> Result<(), ProductsServiceError> {
    let chars = name.chars().count();

    if chars < NAME_MIN_CHARS || chars > NAME_MAX_CHARS {
        return Err(ProductsServiceError::InvalidData);
    }

    Ok(())
}

fn page_window(page: u32, per_page: u32) -> (u32, i64, i64) {
    let page = page.max(1);
    let per_page = per_page.clamp(1, MAX_PER_PAGE);
    let limit = i64::from(per_page);
    let offset = limit * (i64::from(page) - 1);

    (page, limit, offset)
}

fn total_pages(count: i64, per_page: u32) -> u32 {
    let per_page = i64::from(per_page.clamp(1, MAX_PER_PAGE));
    let pages = (count + per_page - 1) / per_page;

    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[async_trait]
impl ProductsService for PgProductsService {
    async fn list_products(
        &self,
        category: Option<Uuid>,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Product>, ProductsServiceError> {
        let (current_page, limit, offset) = page_window(page, per_page);

        let mut tx = self.db.begin().await?;

        let items = self
            .repository
            .list_products(&mut tx, category, limit, offset)
            .await?;

        let count = self.repository.count_products(&mut tx, category).await?;

        tx.commit().await?;

        Ok(Page {
            items,
            total_pages: total_pages(count, per_page),
            current_page,
        })
    }

    async fn get_product(&self, product: Uuid) -> Result<Product, ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let product = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, ProductsServiceError> {
        let product = NewProduct {
            name: product.name.trim().to_string(),
            ..product
        };

        validate_name(&product.name)?;

        let pricing = derive_pricing(
            product.price,
            product.discount_price,
            product.discount_active,
        )?;

        let mut tx = self.db.begin().await?;

        let created = self
            .repository
            .create_product(&mut tx, &product, pricing)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update_product(
        &self,
        product: Uuid,
        update: ProductUpdate,
    ) -> Result<Product, ProductsServiceError> {
        if let Some(name) = &update.name {
            validate_name(name.trim())?;
        }

        let mut tx = self.db.begin().await?;

        let current = self.repository.get_product(&mut tx, product).await?;

        // Pricing is re-derived from the merged state so a price change
        // cannot silently leave a stale discount in place.
        let pricing = derive_pricing(
            update.price.unwrap_or(current.price),
            update.discount_price.or(current.discount_price),
            update.discount_active.unwrap_or(current.discount_active),
        )?;

        let updated = self
            .repository
            .update_product(
                &mut tx,
                product,
                update.name.as_deref().map(str::trim),
                update.description.as_deref(),
                update.image.as_deref(),
                update.weight_grams,
                update.category_uuid,
                pricing,
                update.stock,
            )
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete_product(&self, product: Uuid) -> Result<(), ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.repository.delete_product(&mut tx, product).await?;

        if rows_affected == 0 {
            return Err(ProductsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn list_offers(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Product>, ProductsServiceError> {
        let (current_page, limit, offset) = page_window(page, per_page);

        let mut tx = self.db.begin().await?;

        let items = self.repository.list_offers(&mut tx, limit, offset).await?;
        let count = self.repository.count_offers(&mut tx).await?;

        tx.commit().await?;

        Ok(Page {
            items,
            total_pages: total_pages(count, per_page),
            current_page,
        })
    }

    async fn search_products(
        &self,
        keyword: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Product>, ProductsServiceError> {
        let keyword = keyword.trim();
        let (current_page, limit, offset) = page_window(page, per_page);

        if keyword.is_empty() {
            return Ok(Page {
                items: Vec::new(),
                total_pages: 0,
                current_page,
            });
        }

        let mut tx = self.db.begin().await?;

        let items = self
            .repository
            .search_products(&mut tx, keyword, limit, offset)
            .await?;

        let count = self.repository.count_search(&mut tx, keyword).await?;

        tx.commit().await?;

        Ok(Page {
            items,
            total_pages: total_pages(count, per_page),
            current_page,
        })
    }

    async fn autocomplete_products(
        &self,
        prefix: &str,
        limit: u32,
    ) -> Result<Vec<Product>, ProductsServiceError> {
        let prefix = prefix.trim();

        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        let limit = if limit == 0 {
            DEFAULT_AUTOCOMPLETE_LIMIT
        } else {
            limit.min(MAX_PER_PAGE)
        };

        let mut tx = self.db.begin().await?;

        let products = self
            .repository
            .autocomplete_products(&mut tx, prefix, i64::from(limit))
            .await?;

        tx.commit().await?;

        Ok(products)
    }

    async fn reserve_stock(
        &self,
        product: Uuid,
        quantity: u32,
    ) -> Result<bool, ProductsServiceError> {
        let reserved = self
            .repository
            .reserve_stock(self.db.pool(), product, quantity)
            .await?;

        Ok(reserved)
    }

    async fn restore_stock(&self, product: Uuid, quantity: u32) -> Result<(), ProductsServiceError> {
        self.repository
            .restore_stock(self.db.pool(), product, quantity)
            .await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// Retrieves a page of products, optionally filtered by category.
    async fn list_products(
        &self,
        category: Option<Uuid>,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Product>, ProductsServiceError>;

    /// Retrieve a single product.
    async fn get_product(&self, product: Uuid) -> Result<Product, ProductsServiceError>;

    /// Creates a new product, deriving its discount fields.
    async fn create_product(&self, product: NewProduct) -> Result<Product, ProductsServiceError>;

    /// Applies a partial update, re-deriving discount fields from the
    /// merged state.
    async fn update_product(
        &self,
        product: Uuid,
        update: ProductUpdate,
    ) -> Result<Product, ProductsServiceError>;

    /// Deletes a product with the given UUID.
    async fn delete_product(&self, product: Uuid) -> Result<(), ProductsServiceError>;

    /// Retrieves a page of products with an active, valid discount.
    async fn list_offers(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Product>, ProductsServiceError>;

    /// Full-text search over product names and descriptions.
    async fn search_products(
        &self,
        keyword: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Product>, ProductsServiceError>;

    /// Name-prefix suggestions, name-ordered.
    async fn autocomplete_products(
        &self,
        prefix: &str,
        limit: u32,
    ) -> Result<Vec<Product>, ProductsServiceError>;

    /// Conditionally decrement stock by `quantity`. Returns `false` when
    /// the product tracks stock but cannot cover the quantity, or does not
    /// exist. The decrement is atomic at the storage layer.
    async fn reserve_stock(&self, product: Uuid, quantity: u32)
    -> Result<bool, ProductsServiceError>;

    /// Compensating increment for a prior reservation.
    async fn restore_stock(&self, product: Uuid, quantity: u32)
    -> Result<(), ProductsServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;
    use uuid::Uuid;

    use crate::test::TestContext;

    use super::*;

    #[test]
    fn derive_pricing_inactive_discount_is_zero_percent() -> TestResult {
        let pricing = derive_pricing(10_00, None, false)?;

        assert_eq!(pricing.discount_percent, 0.0);
        assert!(!pricing.discount_active);

        Ok(())
    }

    #[test]
    fn derive_pricing_computes_percent_to_two_decimals() -> TestResult {
        let pricing = derive_pricing(100_00, Some(75_00), true)?;
        assert_eq!(pricing.discount_percent, 25.0);

        let pricing = derive_pricing(3_00, Some(2_00), true)?;
        assert_eq!(pricing.discount_percent, 33.33);

        Ok(())
    }

    #[test]
    fn derive_pricing_rejects_discount_at_or_above_price() {
        assert!(matches!(
            derive_pricing(10_00, Some(10_00), true),
            Err(ProductsServiceError::InvalidDiscount)
        ));

        assert!(matches!(
            derive_pricing(10_00, Some(12_00), true),
            Err(ProductsServiceError::InvalidDiscount)
        ));
    }

    #[test]
    fn derive_pricing_active_discount_requires_a_price() {
        assert!(matches!(
            derive_pricing(10_00, None, true),
            Err(ProductsServiceError::InvalidDiscount)
        ));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[tokio::test]
    async fn create_product_stores_derived_discount() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;

        let product = ctx
            .products
            .create_product(NewProduct {
                uuid: Uuid::now_v7(),
                name: "Dates".to_string(),
                description: None,
                image: None,
                weight_grams: Some(500),
                category_uuid: category,
                price: 100_00,
                discount_price: Some(80_00),
                discount_active: true,
                stock: Some(5),
            })
            .await?;

        assert_eq!(product.price, 100_00);
        assert_eq!(product.discount_price, Some(80_00));
        assert_eq!(product.discount_percent, 20.0);
        assert_eq!(product.effective_price(), 80_00);
        assert_eq!(product.stock, Some(5));

        Ok(())
    }

    #[tokio::test]
    async fn create_product_unknown_category_is_invalid_reference() {
        let ctx = TestContext::new().await;

        let result = ctx
            .products
            .create_product(NewProduct {
                uuid: Uuid::now_v7(),
                name: "Dates".to_string(),
                description: None,
                image: None,
                weight_grams: None,
                category_uuid: Uuid::now_v7(),
                price: 10_00,
                discount_price: None,
                discount_active: false,
                stock: None,
            })
            .await;

        assert!(
            matches!(result, Err(ProductsServiceError::InvalidReference)),
            "expected InvalidReference, got {result:?}"
        );
    }

    #[tokio::test]
    async fn update_price_with_stale_discount_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;

        let product = ctx
            .products
            .create_product(NewProduct {
                uuid: Uuid::now_v7(),
                name: "Dates".to_string(),
                description: None,
                image: None,
                weight_grams: None,
                category_uuid: category,
                price: 200_00,
                discount_price: Some(150_00),
                discount_active: true,
                stock: None,
            })
            .await?;

        // Dropping the list price below the old discount must fail rather
        // than keep an inverted discount.
        let result = ctx
            .products
            .update_product(
                product.uuid,
                ProductUpdate {
                    price: Some(100_00),
                    ..ProductUpdate::default()
                },
            )
            .await;

        assert!(
            matches!(result, Err(ProductsServiceError::InvalidDiscount)),
            "expected InvalidDiscount, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn deactivating_discount_resets_percent() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;

        let product = ctx
            .products
            .create_product(NewProduct {
                uuid: Uuid::now_v7(),
                name: "Dates".to_string(),
                description: None,
                image: None,
                weight_grams: None,
                category_uuid: category,
                price: 100_00,
                discount_price: Some(50_00),
                discount_active: true,
                stock: None,
            })
            .await?;

        let updated = ctx
            .products
            .update_product(
                product.uuid,
                ProductUpdate {
                    discount_active: Some(false),
                    ..ProductUpdate::default()
                },
            )
            .await?;

        assert!(!updated.discount_active);
        assert_eq!(updated.discount_percent, 0.0);
        assert_eq!(updated.effective_price(), 100_00);

        Ok(())
    }

    #[tokio::test]
    async fn list_offers_excludes_inactive_discounts() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;

        ctx.create_product_full(category, "Discounted", 100_00, Some(80_00), true, None)
            .await?;
        ctx.create_product_full(category, "FullPrice", 50_00, None, false, None)
            .await?;

        let offers = ctx.products.list_offers(1, 10).await?;

        assert_eq!(offers.items.len(), 1);
        assert_eq!(offers.items[0].name, "Discounted");
        assert_eq!(offers.total_pages, 1);

        Ok(())
    }

    #[tokio::test]
    async fn search_products_matches_description() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;

        ctx.products
            .create_product(NewProduct {
                uuid: Uuid::now_v7(),
                name: "Medjool".to_string(),
                description: Some("premium dates from the valley".to_string()),
                image: None,
                weight_grams: None,
                category_uuid: category,
                price: 10_00,
                discount_price: None,
                discount_active: false,
                stock: None,
            })
            .await?;

        let hits = ctx.products.search_products("dates", 1, 10).await?;

        assert_eq!(hits.items.len(), 1);
        assert_eq!(hits.items[0].name, "Medjool");

        Ok(())
    }

    #[tokio::test]
    async fn autocomplete_is_prefix_and_name_ordered() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;

        for name in ["Date Syrup", "Dates", "Almonds"] {
            ctx.create_product_full(category, name, 10_00, None, false, None)
                .await?;
        }

        let suggestions = ctx.products.autocomplete_products("Date", 5).await?;

        let names: Vec<&str> = suggestions
            .iter()
            .map(|product| product.name.as_str())
            .collect();

        assert_eq!(names, ["Date Syrup", "Dates"]);

        Ok(())
    }

    #[tokio::test]
    async fn reserve_stock_decrements_once() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 10_00, None, false, Some(5))
            .await?;

        let reserved = ctx.products.reserve_stock(product, 3).await?;
        assert!(reserved);

        let current = ctx.products.get_product(product).await?;
        assert_eq!(current.stock, Some(2));

        Ok(())
    }

    #[tokio::test]
    async fn reserve_stock_fails_without_coverage_and_leaves_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 10_00, None, false, Some(2))
            .await?;

        let reserved = ctx.products.reserve_stock(product, 3).await?;
        assert!(!reserved);

        let current = ctx.products.get_product(product).await?;
        assert_eq!(current.stock, Some(2), "failed reservation must not change stock");

        Ok(())
    }

    #[tokio::test]
    async fn reserve_stock_on_untracked_product_fails_conditionally() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 10_00, None, false, None)
            .await?;

        // Callers are expected to skip untracked products; the primitive
        // itself reports the condition as unmet.
        let reserved = ctx.products.reserve_stock(product, 1).await?;
        assert!(!reserved);

        Ok(())
    }

    #[tokio::test]
    async fn restore_stock_reverses_a_reservation() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 10_00, None, false, Some(5))
            .await?;

        assert!(ctx.products.reserve_stock(product, 4).await?);
        ctx.products.restore_stock(product, 4).await?;

        let current = ctx.products.get_product(product).await?;
        assert_eq!(current.stock, Some(5));

        Ok(())
    }

    #[tokio::test]
    async fn last_unit_goes_to_exactly_one_reservation() -> TestResult {
        let ctx = TestContext::new().await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 10_00, None, false, Some(1))
            .await?;

        let first = ctx.products.reserve_stock(product, 1).await?;
        let second = ctx.products.reserve_stock(product, 1).await?;

        assert!(first);
        assert!(!second, "second reservation must lose the race");

        let current = ctx.products.get_product(product).await?;
        assert_eq!(current.stock, Some(0));

        Ok(())
    }
}
