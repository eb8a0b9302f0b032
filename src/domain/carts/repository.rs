//! Carts Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use uuid::Uuid;

use crate::domain::{
    carts::models::{Cart, CartItem},
    rows::{try_get_amount, try_get_optional_amount, try_get_quantity},
};

const GET_CART_SQL: &str = include_str!("sql/get_cart.sql");
const GET_CART_ITEMS_SQL: &str = include_str!("sql/get_cart_items.sql");
const UPSERT_CART_SQL: &str = include_str!("sql/upsert_cart.sql");
const ADD_CART_ITEM_SQL: &str = include_str!("sql/add_cart_item.sql");
const UPDATE_ITEM_QUANTITY_SQL: &str = include_str!("sql/update_item_quantity.sql");
const REMOVE_CART_ITEM_SQL: &str = include_str!("sql/remove_cart_item.sql");
const CLEAR_CART_SQL: &str = include_str!("sql/clear_cart.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Uuid,
    ) -> Result<Cart, sqlx::Error> {
        query_as::<Postgres, Cart>(GET_CART_SQL)
            .bind(user)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_cart_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Uuid,
    ) -> Result<Vec<CartItem>, sqlx::Error> {
        query_as::<Postgres, CartItem>(GET_CART_ITEMS_SQL)
            .bind(user)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn upsert_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Uuid,
    ) -> Result<(), sqlx::Error> {
        query(UPSERT_CART_SQL).bind(user).execute(&mut **tx).await?;

        Ok(())
    }

    /// Insert or accumulate a cart item, snapshotting the product's current
    /// effective price. Returns `None` when the product does not exist.
    pub(crate) async fn add_cart_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Uuid,
        product: Uuid,
        quantity: u32,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        query_scalar(ADD_CART_ITEM_SQL)
            .bind(Uuid::now_v7())
            .bind(user)
            .bind(i32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
                index: "quantity".to_string(),
                source: Box::new(e),
            })?)
            .bind(product)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn update_item_quantity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Uuid,
        product: Uuid,
        quantity: u32,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_ITEM_QUANTITY_SQL)
            .bind(user)
            .bind(product)
            .bind(i32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
                index: "quantity".to_string(),
                source: Box::new(e),
            })?)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn remove_cart_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Uuid,
        product: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(REMOVE_CART_ITEM_SQL)
            .bind(user)
            .bind(product)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Empty the cart's items; the cart row itself is kept.
    pub(crate) async fn clear_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Uuid,
    ) -> Result<(), sqlx::Error> {
        query(CLEAR_CART_SQL).bind(user).execute(&mut **tx).await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for Cart {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            user_uuid: row.try_get("user_uuid")?,
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for CartItem {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: row.try_get("uuid")?,
            product_uuid: row.try_get("product_uuid")?,
            product_name: row.try_get("product_name")?,
            product_stock: try_get_optional_amount(row, "product_stock")?,
            quantity: try_get_quantity(row, "quantity")?,
            price_at_add: try_get_amount(row, "price_at_add")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
