//! Orders Repository

use std::{collections::HashMap, str::FromStr};

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    orders::models::{NewOrder, Order, OrderItem, OrderStatus},
    rows::{try_get_amount, try_get_quantity},
};

const CREATE_ORDER_SQL: &str = include_str!("sql/create_order.sql");
const CREATE_ORDER_ITEM_SQL: &str = include_str!("sql/create_order_item.sql");
const GET_ORDER_SQL: &str = include_str!("sql/get_order.sql");
const LIST_ORDERS_BY_USER_SQL: &str = include_str!("sql/list_orders_by_user.sql");
const LIST_ORDERS_SQL: &str = include_str!("sql/list_orders.sql");
const LIST_ORDER_ITEMS_SQL: &str = include_str!("sql/list_order_items.sql");
const SET_ORDER_STATUS_SQL: &str = include_str!("sql/set_order_status.sql");
const DELETE_ORDER_SQL: &str = include_str!("sql/delete_order.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &NewOrder,
    ) -> Result<(), sqlx::Error> {
        query(CREATE_ORDER_SQL)
            .bind(order.uuid)
            .bind(order.user_uuid)
            .bind(amount_param(order.total)?)
            .bind(&order.address)
            .bind(&order.phone)
            .bind(order.status.as_str())
            .execute(&mut **tx)
            .await?;

        for item in &order.items {
            query(CREATE_ORDER_ITEM_SQL)
                .bind(item.uuid)
                .bind(order.uuid)
                .bind(item.product_uuid)
                .bind(&item.name)
                .bind(quantity_param(item.quantity)?)
                .bind(amount_param(item.price_at_order)?)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }

    pub(crate) async fn get_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: Uuid,
    ) -> Result<Order, sqlx::Error> {
        let mut order = query_as::<Postgres, Order>(GET_ORDER_SQL)
            .bind(order)
            .fetch_one(&mut **tx)
            .await?;

        let mut items = self.list_items(tx, &[order.uuid]).await?;

        order.items = items.remove(&order.uuid).unwrap_or_default();

        Ok(order)
    }

    pub(crate) async fn list_orders_by_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Uuid,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let orders = query_as::<Postgres, Order>(LIST_ORDERS_BY_USER_SQL)
            .bind(user)
            .fetch_all(&mut **tx)
            .await?;

        self.attach_items(tx, orders).await
    }

    pub(crate) async fn list_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let orders = query_as::<Postgres, Order>(LIST_ORDERS_SQL)
            .fetch_all(&mut **tx)
            .await?;

        self.attach_items(tx, orders).await
    }

    pub(crate) async fn set_order_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: Uuid,
        status: OrderStatus,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(SET_ORDER_STATUS_SQL)
            .bind(order)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn delete_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_ORDER_SQL)
            .bind(order)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn attach_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        mut orders: Vec<Order>,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let order_uuids: Vec<Uuid> = orders.iter().map(|order| order.uuid).collect();
        let mut items = self.list_items(tx, &order_uuids).await?;

        for order in &mut orders {
            order.items = items.remove(&order.uuid).unwrap_or_default();
        }

        Ok(orders)
    }

    async fn list_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_uuids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderItem>>, sqlx::Error> {
        let rows = query_as::<Postgres, OrderItemRow>(LIST_ORDER_ITEMS_SQL)
            .bind(order_uuids)
            .fetch_all(&mut **tx)
            .await?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();

        for row in rows {
            items.entry(row.order_uuid).or_default().push(row.item);
        }

        Ok(items)
    }
}

struct OrderItemRow {
    order_uuid: Uuid,
    item: OrderItem,
}

impl<'r> FromRow<'r, PgRow> for Order {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status: String = row.try_get("status")?;

        let status = OrderStatus::from_str(&status).map_err(|_| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: format!("unrecognized status {status:?}").into(),
        })?;

        Ok(Self {
            uuid: row.try_get("uuid")?,
            user_uuid: row.try_get("user_uuid")?,
            total: try_get_amount(row, "total")?,
            address: row.try_get("address")?,
            phone: row.try_get("phone")?,
            status,
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderItemRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            order_uuid: row.try_get("order_uuid")?,
            item: OrderItem {
                uuid: row.try_get("uuid")?,
                product_uuid: row.try_get("product_uuid")?,
                name: row.try_get("name")?,
                quantity: try_get_quantity(row, "quantity")?,
                price_at_order: try_get_amount(row, "price_at_order")?,
            },
        })
    }
}

fn amount_param(value: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: "total".to_string(),
        source: Box::new(e),
    })
}

fn quantity_param(value: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: "quantity".to_string(),
        source: Box::new(e),
    })
}
