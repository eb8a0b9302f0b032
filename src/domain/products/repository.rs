//! Products Repository

use sqlx::{FromRow, PgPool, Postgres, Row, Transaction, postgres::PgRow, query, query_as,
    query_scalar};
use jiff_sqlx::Timestamp as SqlxTimestamp;
use uuid::Uuid;

use crate::domain::{
    products::models::{NewProduct, Product},
    rows::{try_get_amount, try_get_optional_amount},
};

const LIST_PRODUCTS_SQL: &str = include_str!("sql/list_products.sql");
const COUNT_PRODUCTS_SQL: &str = include_str!("sql/count_products.sql");
const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const UPDATE_PRODUCT_SQL: &str = include_str!("sql/update_product.sql");
const DELETE_PRODUCT_SQL: &str = include_str!("sql/delete_product.sql");
const LIST_OFFERS_SQL: &str = include_str!("sql/list_offers.sql");
const COUNT_OFFERS_SQL: &str = include_str!("sql/count_offers.sql");
const SEARCH_PRODUCTS_SQL: &str = include_str!("sql/search_products.sql");
const COUNT_SEARCH_SQL: &str = include_str!("sql/count_search.sql");
const AUTOCOMPLETE_PRODUCTS_SQL: &str = include_str!("sql/autocomplete_products.sql");
const RESERVE_STOCK_SQL: &str = include_str!("sql/reserve_stock.sql");
const RESTORE_STOCK_SQL: &str = include_str!("sql/restore_stock.sql");

/// Pricing values derived by the service before persistence.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PricingParams {
    pub(crate) price: u64,
    pub(crate) discount_price: Option<u64>,
    pub(crate) discount_percent: f64,
    pub(crate) discount_active: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgProductsRepository;

impl PgProductsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        category: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, sqlx::Error> {
        query_as::<Postgres, Product>(LIST_PRODUCTS_SQL)
            .bind(category)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn count_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        category: Option<Uuid>,
    ) -> Result<i64, sqlx::Error> {
        query_scalar(COUNT_PRODUCTS_SQL)
            .bind(category)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: Uuid,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(GET_PRODUCT_SQL)
            .bind(product)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: &NewProduct,
        pricing: PricingParams,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(CREATE_PRODUCT_SQL)
            .bind(product.uuid)
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.image)
            .bind(weight_param(product.weight_grams)?)
            .bind(product.category_uuid)
            .bind(amount_param(pricing.price, "price")?)
            .bind(optional_amount_param(pricing.discount_price, "discount_price")?)
            .bind(pricing.discount_percent)
            .bind(pricing.discount_active)
            .bind(optional_amount_param(product.stock, "stock")?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        image: Option<&str>,
        weight_grams: Option<u32>,
        category: Option<Uuid>,
        pricing: PricingParams,
        stock: Option<u64>,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(UPDATE_PRODUCT_SQL)
            .bind(product)
            .bind(name)
            .bind(description)
            .bind(image)
            .bind(weight_param(weight_grams)?)
            .bind(category)
            .bind(amount_param(pricing.price, "price")?)
            .bind(optional_amount_param(pricing.discount_price, "discount_price")?)
            .bind(pricing.discount_percent)
            .bind(pricing.discount_active)
            .bind(optional_amount_param(stock, "stock")?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_PRODUCT_SQL)
            .bind(product)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn list_offers(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, sqlx::Error> {
        query_as::<Postgres, Product>(LIST_OFFERS_SQL)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn count_offers(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<i64, sqlx::Error> {
        query_scalar(COUNT_OFFERS_SQL).fetch_one(&mut **tx).await
    }

    pub(crate) async fn search_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        keyword: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, sqlx::Error> {
        query_as::<Postgres, Product>(SEARCH_PRODUCTS_SQL)
            .bind(keyword)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn count_search(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        keyword: &str,
    ) -> Result<i64, sqlx::Error> {
        query_scalar(COUNT_SEARCH_SQL)
            .bind(keyword)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn autocomplete_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        prefix: &str,
        limit: i64,
    ) -> Result<Vec<Product>, sqlx::Error> {
        query_as::<Postgres, Product>(AUTOCOMPLETE_PRODUCTS_SQL)
            .bind(prefix)
            .bind(limit)
            .fetch_all(&mut **tx)
            .await
    }

    /// Conditional decrement: succeeds only when the product tracks stock
    /// and the remaining stock covers `quantity`. Runs as a single
    /// auto-committed statement so a successful reservation is durable on
    /// its own.
    pub(crate) async fn reserve_stock(
        &self,
        pool: &PgPool,
        product: Uuid,
        quantity: u32,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected = query(RESERVE_STOCK_SQL)
            .bind(product)
            .bind(i64::from(quantity))
            .execute(pool)
            .await?
            .rows_affected();

        Ok(rows_affected == 1)
    }

    /// Compensating increment for a prior successful reservation. No-op on
    /// untracked stock.
    pub(crate) async fn restore_stock(
        &self,
        pool: &PgPool,
        product: Uuid,
        quantity: u32,
    ) -> Result<(), sqlx::Error> {
        query(RESTORE_STOCK_SQL)
            .bind(product)
            .bind(i64::from(quantity))
            .execute(pool)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let weight_i32: Option<i32> = row.try_get("weight_grams")?;

        let weight_grams = weight_i32
            .map(|value| {
                u32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "weight_grams".to_string(),
                    source: Box::new(e),
                })
            })
            .transpose()?;

        Ok(Self {
            uuid: row.try_get("uuid")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            image: row.try_get("image")?,
            weight_grams,
            category_uuid: row.try_get("category_uuid")?,
            price: try_get_amount(row, "price")?,
            discount_price: try_get_optional_amount(row, "discount_price")?,
            discount_percent: row.try_get("discount_percent")?,
            discount_active: row.try_get("discount_active")?,
            stock: try_get_optional_amount(row, "stock")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

fn amount_param(value: u64, col: &str) -> Result<i64, sqlx::Error> {
    i64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

fn optional_amount_param(value: Option<u64>, col: &str) -> Result<Option<i64>, sqlx::Error> {
    value.map(|value| amount_param(value, col)).transpose()
}

fn weight_param(value: Option<u32>) -> Result<Option<i32>, sqlx::Error> {
    value
        .map(|value| {
            i32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
                index: "weight_grams".to_string(),
                source: Box::new(e),
            })
        })
        .transpose()
}
