//! Order repository: persistence for the order engine and lifecycle
//! tracker.
//!
//! Order creation increments the organization's order-number counter as
//! the first statement of its transaction; the counter row acts as a
//! per-tenant lock, so concurrent orders for one organization serialize
//! and numbers come out gapless within a successful run.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use stallfront_core::{
    Cents, MenuItemId, ModifierOptionId, OrderId, OrderItemId, OrderStatus, OrganizationId,
};

use super::RepositoryError;
use crate::models::{Order, OrderItem, OrderItemModifier, PricedLine};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    organization_id: OrganizationId,
    order_number: i64,
    customer_name: String,
    status: String,
    total: Cents,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: OrderItemId,
    order_id: OrderId,
    menu_item_id: Option<MenuItemId>,
    name: String,
    quantity: i64,
    unit_price: Cents,
}

#[derive(sqlx::FromRow)]
struct ItemModifierRow {
    order_item_id: OrderItemId,
    modifier_option_id: Option<ModifierOptionId>,
    name: String,
    price_adjustment: Cents,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a priced order in one transaction: claim the next order
    /// number, insert the order row, then its lines and their modifier
    /// snapshots.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the organization doesn't
    /// exist; `RepositoryError::Database` if a statement fails, in which
    /// case nothing (including the counter bump) is committed.
    pub async fn create(
        &self,
        organization_id: OrganizationId,
        customer_name: &str,
        total: Cents,
        lines: &[PricedLine],
    ) -> Result<Order, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let order_number: Option<i64> = sqlx::query_scalar(
            r"
            UPDATE organization
            SET next_order_number = next_order_number + 1
            WHERE id = ?
            RETURNING next_order_number
            ",
        )
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?;

        let order_number = order_number.ok_or(RepositoryError::NotFound)?;

        let order_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO orders
                (organization_id, order_number, customer_name, status, total, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            ",
        )
        .bind(organization_id)
        .bind(order_number)
        .bind(customer_name)
        .bind(OrderStatus::Received.as_str())
        .bind(total)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let item_id: i64 = sqlx::query_scalar(
                r"
                INSERT INTO order_item (order_id, menu_item_id, name, quantity, unit_price)
                VALUES (?, ?, ?, ?, ?)
                RETURNING id
                ",
            )
            .bind(order_id)
            .bind(line.menu_item_id)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .fetch_one(&mut *tx)
            .await?;

            let mut modifiers = Vec::with_capacity(line.modifiers.len());
            for selection in &line.modifiers {
                sqlx::query(
                    r"
                    INSERT INTO order_item_modifier
                        (order_item_id, modifier_option_id, name, price_adjustment)
                    VALUES (?, ?, ?, ?)
                    ",
                )
                .bind(item_id)
                .bind(selection.modifier_option_id)
                .bind(&selection.name)
                .bind(selection.price_adjustment)
                .execute(&mut *tx)
                .await?;

                modifiers.push(OrderItemModifier {
                    modifier_option_id: Some(selection.modifier_option_id),
                    name: selection.name.clone(),
                    price_adjustment: selection.price_adjustment,
                });
            }

            items.push(OrderItem {
                id: OrderItemId::new(item_id),
                menu_item_id: Some(line.menu_item_id),
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                modifiers,
            });
        }

        tx.commit().await?;

        Ok(Order {
            id: OrderId::new(order_id),
            organization_id,
            order_number,
            customer_name: customer_name.to_owned(),
            status: OrderStatus::Received,
            total,
            created_at: now,
            items,
        })
    }

    /// List the organization's orders, newest first, with nested lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails;
    /// `RepositoryError::DataCorruption` if a stored status fails to parse.
    pub async fn list(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, organization_id, order_number, customer_name, status, total, created_at
            FROM orders
            WHERE organization_id = ?
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(organization_id)
        .fetch_all(&mut *tx)
        .await?;

        let orders = assemble(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(orders)
    }

    /// Get one order with nested lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist or
    /// belongs to another organization.
    pub async fn get(
        &self,
        organization_id: OrganizationId,
        order_id: OrderId,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, organization_id, order_number, customer_name, status, total, created_at
            FROM orders
            WHERE organization_id = ? AND id = ?
            ",
        )
        .bind(organization_id)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let mut orders = assemble(&mut tx, vec![row]).await?;
        tx.commit().await?;
        orders.pop().ok_or(RepositoryError::NotFound)
    }

    /// Set an order's status. Transitions are unrestricted; staff may move
    /// an order backwards to correct a mistake.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist or
    /// belongs to another organization.
    pub async fn set_status(
        &self,
        organization_id: OrganizationId,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = ?
            WHERE organization_id = ? AND id = ?
            ",
        )
        .bind(status.as_str())
        .bind(organization_id)
        .bind(order_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(organization_id, order_id).await
    }

    /// Delete every order of the organization. The order-number counter is
    /// deliberately left alone so numbers never repeat within a tenant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear_all(&self, organization_id: OrganizationId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE organization_id = ?")
            .bind(organization_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

}

/// Attach nested lines and modifier snapshots to a batch of order rows with
/// two further queries.
///
/// Runs on the caller's transaction so the nested result is one consistent
/// snapshot.
async fn assemble(
    tx: &mut Transaction<'_, Sqlite>,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, RepositoryError> {
    let mut orders = Vec::with_capacity(rows.len());
    for r in rows {
        let status = r
            .status
            .parse::<OrderStatus>()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {}: {e}", r.id)))?;
        orders.push(Order {
            id: r.id,
            organization_id: r.organization_id,
            order_number: r.order_number,
            customer_name: r.customer_name,
            status,
            total: r.total,
            created_at: r.created_at,
            items: Vec::new(),
        });
    }

    if orders.is_empty() {
        return Ok(orders);
    }

    let order_ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();

    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
        "SELECT id, order_id, menu_item_id, name, quantity, unit_price FROM order_item WHERE order_id IN (",
    );
    let mut sep = qb.separated(", ");
    for id in &order_ids {
        sep.push_bind(*id);
    }
    qb.push(") ORDER BY order_id, id");

    let item_rows: Vec<ItemRow> = qb.build_query_as().fetch_all(&mut **tx).await?;

    let mut items: Vec<(OrderId, OrderItem)> = item_rows
        .into_iter()
        .map(|r| {
            (
                r.order_id,
                OrderItem {
                    id: r.id,
                    menu_item_id: r.menu_item_id,
                    name: r.name,
                    quantity: r.quantity,
                    unit_price: r.unit_price,
                    modifiers: Vec::new(),
                },
            )
        })
        .collect();

    if !items.is_empty() {
        let item_ids: Vec<OrderItemId> = items.iter().map(|(_, i)| i.id).collect();

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT order_item_id, modifier_option_id, name, price_adjustment FROM order_item_modifier WHERE order_item_id IN (",
        );
        let mut sep = qb.separated(", ");
        for id in &item_ids {
            sep.push_bind(*id);
        }
        qb.push(") ORDER BY order_item_id, id");

        let modifier_rows: Vec<ItemModifierRow> = qb.build_query_as().fetch_all(&mut **tx).await?;

        let mut modifiers_by_item: HashMap<OrderItemId, Vec<OrderItemModifier>> = HashMap::new();
        for r in modifier_rows {
            modifiers_by_item
                .entry(r.order_item_id)
                .or_default()
                .push(OrderItemModifier {
                    modifier_option_id: r.modifier_option_id,
                    name: r.name,
                    price_adjustment: r.price_adjustment,
                });
        }

        for (_, item) in &mut items {
            if let Some(mods) = modifiers_by_item.remove(&item.id) {
                item.modifiers = mods;
            }
        }
    }

    let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for (order_id, item) in items {
        items_by_order.entry(order_id).or_default().push(item);
    }

    for order in &mut orders {
        if let Some(order_items) = items_by_order.remove(&order.id) {
            order.items = order_items;
        }
    }

    Ok(orders)
}
