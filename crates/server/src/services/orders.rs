//! Order placement: validation, server-side pricing, and persistence.
//!
//! Prices come exclusively from the catalog at placement time; the
//! request schema carries no price fields, so a tampering client has
//! nothing to tamper with. Each line snapshots the resolved names and
//! amounts before the order is persisted.

use axum::http::StatusCode;
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;

use stallfront_core::{Cents, MenuItemId, ModifierOptionId, Slug};

use crate::db::menu::MenuRepository;
use crate::db::orders::OrderRepository;
use crate::db::organizations::OrganizationRepository;
use crate::db::RepositoryError;
use crate::models::{Order, PricedLine, PricedLineModifier};

const MAX_CUSTOMER_NAME_LENGTH: usize = 100;
const MAX_LINE_QUANTITY: i64 = 1_000;

/// Errors from the order engine.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed cart: empty, blank name, bad quantity, or a reference
    /// that doesn't resolve within the organization.
    #[error("{0}")]
    Validation(String),

    /// The organization slug resolves to nothing.
    #[error("organization not found")]
    OrganizationNotFound,

    /// Repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl OrderError {
    pub(crate) fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::OrganizationNotFound => {
                (StatusCode::NOT_FOUND, "organization not found".to_owned())
            }
            Self::Repository(err) => match err {
                RepositoryError::NotFound => {
                    (StatusCode::NOT_FOUND, "not found".to_owned())
                }
                RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    tracing::error!(error = %err, "repository error during order placement");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_owned(),
                    )
                }
            },
        }
    }
}

/// Customer-submitted order payload. No price fields by construction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub customer_name: String,
    pub items: Vec<PlaceOrderItem>,
}

/// One cart line: an item reference, a quantity, and selected options.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderItem {
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
    #[serde(default)]
    pub modifiers: Vec<PlaceOrderModifier>,
}

/// A selected modifier option.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderModifier {
    pub option_id: ModifierOptionId,
}

/// Order placement service.
pub struct OrderService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Price and persist a customer order for the organization behind
    /// `slug`.
    ///
    /// Any unresolvable reference fails the whole order before anything
    /// is written; an unavailable or cross-tenant item reads exactly like
    /// a nonexistent one.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrganizationNotFound` for an unknown slug,
    /// `OrderError::Validation` for a malformed or unresolvable cart, and
    /// `OrderError::Repository` for persistence failures.
    pub async fn place_order(&self, slug: &Slug, input: &PlaceOrder) -> Result<Order, OrderError> {
        let organization = OrganizationRepository::new(self.pool)
            .find_by_slug(slug)
            .await?
            .ok_or(OrderError::OrganizationNotFound)?;

        let customer_name = input.customer_name.trim();
        if customer_name.is_empty() {
            return Err(OrderError::Validation("customer name is required".to_owned()));
        }
        if customer_name.len() > MAX_CUSTOMER_NAME_LENGTH {
            return Err(OrderError::Validation(format!(
                "customer name must be at most {MAX_CUSTOMER_NAME_LENGTH} characters"
            )));
        }
        if input.items.is_empty() {
            return Err(OrderError::Validation(
                "order must contain at least one item".to_owned(),
            ));
        }
        for item in &input.items {
            if item.quantity < 1 || item.quantity > MAX_LINE_QUANTITY {
                return Err(OrderError::Validation(format!(
                    "quantity must be between 1 and {MAX_LINE_QUANTITY}"
                )));
            }
        }

        let menu = MenuRepository::new(self.pool);

        let item_ids: Vec<MenuItemId> = input.items.iter().map(|i| i.menu_item_id).collect();
        let option_ids: Vec<ModifierOptionId> = input
            .items
            .iter()
            .flat_map(|i| i.modifiers.iter().map(|m| m.option_id))
            .collect();

        let items_by_id = menu
            .load_available_by_ids(organization.id, &item_ids)
            .await?;
        let options_by_id = menu.load_options_by_ids(organization.id, &option_ids).await?;

        let mut total = Cents::ZERO;
        let mut lines = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let menu_item = items_by_id.get(&item.menu_item_id).ok_or_else(|| {
                OrderError::Validation("menu item not found or unavailable".to_owned())
            })?;

            let mut unit_price = menu_item.price;
            let mut modifiers = Vec::with_capacity(item.modifiers.len());
            for selection in &item.modifiers {
                let option = options_by_id.get(&selection.option_id).ok_or_else(|| {
                    OrderError::Validation("modifier option not found".to_owned())
                })?;
                unit_price = unit_price
                    .checked_add(option.price_adjustment)
                    .ok_or_else(total_out_of_range)?;
                modifiers.push(PricedLineModifier {
                    modifier_option_id: option.id,
                    name: option.name.clone(),
                    price_adjustment: option.price_adjustment,
                });
            }

            let line_total = unit_price
                .checked_mul(item.quantity)
                .ok_or_else(total_out_of_range)?;
            total = total.checked_add(line_total).ok_or_else(total_out_of_range)?;
            lines.push(PricedLine {
                menu_item_id: menu_item.id,
                name: menu_item.name.clone(),
                quantity: item.quantity,
                unit_price,
                modifiers,
            });
        }

        let order = OrderRepository::new(self.pool)
            .create(organization.id, customer_name, total, &lines)
            .await?;

        tracing::info!(
            organization = %slug,
            order_number = order.order_number,
            total = %order.total,
            "order placed"
        );

        Ok(order)
    }
}

fn total_out_of_range() -> OrderError {
    OrderError::Validation("order total out of range".to_owned())
}
