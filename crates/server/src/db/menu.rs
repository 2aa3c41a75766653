//! Menu repository: the catalog store.
//!
//! Every method takes the owning [`OrganizationId`] first and filters on
//! it, so a cross-tenant item id behaves exactly like a nonexistent one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use stallfront_core::{Cents, MenuItemId, ModifierId, ModifierOptionId, OrganizationId};

use super::RepositoryError;
use crate::models::{MenuItem, MenuItemUpdate, Modifier, ModifierOption, NewMenuItem, NewModifier};

/// Menu item fields needed to price an order line.
#[derive(Debug, Clone)]
pub struct PricingItem {
    pub id: MenuItemId,
    pub name: String,
    pub price: Cents,
}

/// Modifier option fields needed to price an order line.
#[derive(Debug, Clone)]
pub struct PricingOption {
    pub id: ModifierOptionId,
    pub name: String,
    pub price_adjustment: Cents,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: MenuItemId,
    organization_id: OrganizationId,
    name: String,
    description: Option<String>,
    image: Option<String>,
    price: Cents,
    allergens: Option<String>,
    available: bool,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ModifierRow {
    id: ModifierId,
    menu_item_id: MenuItemId,
    name: String,
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    id: ModifierOptionId,
    modifier_id: ModifierId,
    name: String,
    price_adjustment: Cents,
}

/// Repository for menu database operations.
pub struct MenuRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MenuRepository<'a> {
    /// Create a new menu repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List the organization's available items in creation order, with
    /// nested modifiers and options. This is the public menu.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_available(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<MenuItem>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT id, organization_id, name, description, image, price,
                   allergens, available, created_at
            FROM menu_item
            WHERE organization_id = ? AND available = 1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(organization_id)
        .fetch_all(&mut *tx)
        .await?;

        let items = assemble(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(items)
    }

    /// List every item of the organization, hidden ones included. Admin
    /// listing only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_all(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<MenuItem>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT id, organization_id, name, description, image, price,
                   allergens, available, created_at
            FROM menu_item
            WHERE organization_id = ?
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(organization_id)
        .fetch_all(&mut *tx)
        .await?;

        let items = assemble(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(items)
    }

    /// Get one item with nested modifiers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist or
    /// belongs to another organization.
    pub async fn get(
        &self,
        organization_id: OrganizationId,
        item_id: MenuItemId,
    ) -> Result<MenuItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT id, organization_id, name, description, image, price,
                   allergens, available, created_at
            FROM menu_item
            WHERE organization_id = ? AND id = ?
            ",
        )
        .bind(organization_id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let mut items = assemble(&mut tx, vec![row]).await?;
        tx.commit().await?;
        items.pop().ok_or(RepositoryError::NotFound)
    }

    /// Create an item with its modifiers and options in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails; nothing is
    /// committed in that case.
    pub async fn create(
        &self,
        organization_id: OrganizationId,
        item: &NewMenuItem,
    ) -> Result<MenuItem, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let item_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO menu_item
                (organization_id, name, description, image, price, allergens, available, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            ",
        )
        .bind(organization_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.image)
        .bind(item.price)
        .bind(&item.allergens)
        .bind(item.available)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        insert_modifiers(&mut tx, item_id, &item.modifiers).await?;

        tx.commit().await?;

        self.get(organization_id, MenuItemId::new(item_id)).await
    }

    /// Apply a field-mask update. A supplied modifier list atomically
    /// replaces the item's whole modifier set: a concurrent reader sees
    /// either the old set or the new one, never a mix.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist or
    /// belongs to another organization; `RepositoryError::Database` if a
    /// statement fails (the transaction rolls back).
    pub async fn update(
        &self,
        organization_id: OrganizationId,
        item_id: MenuItemId,
        update: &MenuItemUpdate,
    ) -> Result<MenuItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Ownership check inside the transaction; cross-tenant reads as missing.
        let exists: Option<i64> = sqlx::query_scalar(
            r"
            SELECT id FROM menu_item
            WHERE organization_id = ? AND id = ?
            ",
        )
        .bind(organization_id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?;

        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        if update.touches_item_row() {
            let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE menu_item SET ");
            let mut fields = qb.separated(", ");
            if let Some(name) = &update.name {
                fields.push("name = ").push_bind_unseparated(name);
            }
            if let Some(description) = &update.description {
                fields
                    .push("description = ")
                    .push_bind_unseparated(description.as_deref());
            }
            if let Some(image) = &update.image {
                fields.push("image = ").push_bind_unseparated(image.as_deref());
            }
            if let Some(price) = update.price {
                fields.push("price = ").push_bind_unseparated(price);
            }
            if let Some(allergens) = &update.allergens {
                fields
                    .push("allergens = ")
                    .push_bind_unseparated(allergens.as_deref());
            }
            if let Some(available) = update.available {
                fields.push("available = ").push_bind_unseparated(available);
            }
            qb.push(" WHERE organization_id = ")
                .push_bind(organization_id)
                .push(" AND id = ")
                .push_bind(item_id);

            qb.build().execute(&mut *tx).await?;
        }

        if let Some(modifiers) = &update.modifiers {
            sqlx::query("DELETE FROM modifier WHERE menu_item_id = ?")
                .bind(item_id)
                .execute(&mut *tx)
                .await?;

            insert_modifiers(&mut tx, item_id.as_i64(), modifiers).await?;
        }

        tx.commit().await?;

        self.get(organization_id, item_id).await
    }

    /// Delete an item. Modifiers and options cascade; historical order
    /// lines keep their snapshots and drop the reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist or
    /// belongs to another organization.
    pub async fn delete(
        &self,
        organization_id: OrganizationId,
        item_id: MenuItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM menu_item
            WHERE organization_id = ? AND id = ?
            ",
        )
        .bind(organization_id)
        .bind(item_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Batch-load available items by id for order pricing.
    ///
    /// One query regardless of cart size. Hidden and cross-tenant items
    /// are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load_available_by_ids(
        &self,
        organization_id: OrganizationId,
        ids: &[MenuItemId],
    ) -> Result<HashMap<MenuItemId, PricingItem>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        #[derive(sqlx::FromRow)]
        struct Row {
            id: MenuItemId,
            name: String,
            price: Cents,
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT id, name, price FROM menu_item WHERE organization_id = ",
        );
        qb.push_bind(organization_id);
        qb.push(" AND available = 1 AND id IN (");
        let mut sep = qb.separated(", ");
        for id in ids {
            sep.push_bind(*id);
        }
        qb.push(")");

        let rows: Vec<Row> = qb.build_query_as().fetch_all(self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.id,
                    PricingItem {
                        id: r.id,
                        name: r.name,
                        price: r.price,
                    },
                )
            })
            .collect())
    }

    /// Batch-load modifier options by id for order pricing, scoped through
    /// their owning item's organization. A foreign option id is absent from
    /// the result, indistinguishable from an unknown one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load_options_by_ids(
        &self,
        organization_id: OrganizationId,
        ids: &[ModifierOptionId],
    ) -> Result<HashMap<ModifierOptionId, PricingOption>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        #[derive(sqlx::FromRow)]
        struct Row {
            id: ModifierOptionId,
            name: String,
            price_adjustment: Cents,
        }

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            r"
            SELECT o.id, o.name, o.price_adjustment
            FROM modifier_option o
            JOIN modifier m ON m.id = o.modifier_id
            JOIN menu_item i ON i.id = m.menu_item_id
            WHERE i.organization_id = ",
        );
        qb.push_bind(organization_id);
        qb.push(" AND o.id IN (");
        let mut sep = qb.separated(", ");
        for id in ids {
            sep.push_bind(*id);
        }
        qb.push(")");

        let rows: Vec<Row> = qb.build_query_as().fetch_all(self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.id,
                    PricingOption {
                        id: r.id,
                        name: r.name,
                        price_adjustment: r.price_adjustment,
                    },
                )
            })
            .collect())
    }
}

/// Attach nested modifiers and options to a batch of item rows with two
/// further queries.
///
/// Runs on the caller's transaction so the nested result is one consistent
/// snapshot; reading modifiers and options off the bare pool could observe
/// the middle of a concurrent modifier-set replacement.
async fn assemble(
    tx: &mut Transaction<'_, Sqlite>,
    rows: Vec<ItemRow>,
) -> Result<Vec<MenuItem>, RepositoryError> {
    let mut items: Vec<MenuItem> = rows
        .into_iter()
        .map(|r| MenuItem {
            id: r.id,
            organization_id: r.organization_id,
            name: r.name,
            description: r.description,
            image: r.image,
            price: r.price,
            allergens: r.allergens,
            available: r.available,
            created_at: r.created_at,
            modifiers: Vec::new(),
        })
        .collect();

    if items.is_empty() {
        return Ok(items);
    }

    let item_ids: Vec<MenuItemId> = items.iter().map(|i| i.id).collect();

    let mut qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("SELECT id, menu_item_id, name FROM modifier WHERE menu_item_id IN (");
    let mut sep = qb.separated(", ");
    for id in &item_ids {
        sep.push_bind(*id);
    }
    qb.push(") ORDER BY menu_item_id, position, id");

    let modifier_rows: Vec<ModifierRow> = qb.build_query_as().fetch_all(&mut **tx).await?;

    let mut modifiers: Vec<Modifier> = modifier_rows
        .into_iter()
        .map(|r| Modifier {
            id: r.id,
            menu_item_id: r.menu_item_id,
            name: r.name,
            options: Vec::new(),
        })
        .collect();

    if !modifiers.is_empty() {
        let modifier_ids: Vec<ModifierId> = modifiers.iter().map(|m| m.id).collect();

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "SELECT id, modifier_id, name, price_adjustment FROM modifier_option WHERE modifier_id IN (",
        );
        let mut sep = qb.separated(", ");
        for id in &modifier_ids {
            sep.push_bind(*id);
        }
        qb.push(") ORDER BY modifier_id, position, id");

        let option_rows: Vec<OptionRow> = qb.build_query_as().fetch_all(&mut **tx).await?;

        let mut options_by_modifier: HashMap<ModifierId, Vec<ModifierOption>> = HashMap::new();
        for r in option_rows {
            options_by_modifier
                .entry(r.modifier_id)
                .or_default()
                .push(ModifierOption {
                    id: r.id,
                    modifier_id: r.modifier_id,
                    name: r.name,
                    price_adjustment: r.price_adjustment,
                });
        }

        for modifier in &mut modifiers {
            if let Some(options) = options_by_modifier.remove(&modifier.id) {
                modifier.options = options;
            }
        }
    }

    let mut modifiers_by_item: HashMap<MenuItemId, Vec<Modifier>> = HashMap::new();
    for modifier in modifiers {
        modifiers_by_item
            .entry(modifier.menu_item_id)
            .or_default()
            .push(modifier);
    }

    for item in &mut items {
        if let Some(mods) = modifiers_by_item.remove(&item.id) {
            item.modifiers = mods;
        }
    }

    Ok(items)
}

/// Insert a modifier set for an item, preserving submitted order via the
/// `position` column.
async fn insert_modifiers(
    tx: &mut Transaction<'_, Sqlite>,
    item_id: i64,
    modifiers: &[NewModifier],
) -> Result<(), RepositoryError> {
    for (position, modifier) in modifiers.iter().enumerate() {
        let modifier_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO modifier (menu_item_id, name, position)
            VALUES (?, ?, ?)
            RETURNING id
            ",
        )
        .bind(item_id)
        .bind(&modifier.name)
        .bind(position as i64)
        .fetch_one(&mut **tx)
        .await?;

        for (option_position, option) in modifier.options.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO modifier_option (modifier_id, name, price_adjustment, position)
                VALUES (?, ?, ?, ?)
                ",
            )
            .bind(modifier_id)
            .bind(&option.name)
            .bind(option.price_adjustment)
            .bind(option_position as i64)
            .execute(&mut **tx)
            .await?;
        }
    }

    Ok(())
}
