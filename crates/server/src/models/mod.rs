//! Domain entities and input shapes.
//!
//! Every entity transitively belongs to exactly one organization; the
//! repositories in [`crate::db`] enforce that scoping on every query.
//! Wire payloads are camelCase, matching the public API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use stallfront_core::{
    Cents, MembershipId, MenuItemId, ModifierId, ModifierOptionId, OrderId, OrderItemId,
    OrderStatus, OrganizationId, Slug, UserId,
};

/// One tenant: a popup vendor with a menu and an order queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: OrganizationId,
    pub slug: Slug,
    pub name: String,
    pub checkout_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A staff account. Password hashes never leave the repository layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Links a user to an organization with a role.
///
/// At most one membership exists per (user, organization) pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: String,
}

/// A menu item with its nested modifier groups.
///
/// Hidden items (`available = false`) are excluded from customer-facing
/// listings but remain visible and editable to staff.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: MenuItemId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Cents,
    pub allergens: Option<String>,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub modifiers: Vec<Modifier>,
}

/// A customization axis on a menu item (e.g. "Size").
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    pub id: ModifierId,
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub options: Vec<ModifierOption>,
}

/// A selectable value of a modifier, with a signed price delta.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierOption {
    pub id: ModifierOptionId,
    pub modifier_id: ModifierId,
    pub name: String,
    pub price_adjustment: Cents,
}

/// An immutable order record. Only `status` changes after creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub organization_id: OrganizationId,
    /// Per-organization monotonic sequence shown to customers.
    pub order_number: i64,
    pub customer_name: String,
    pub status: OrderStatus,
    /// Authoritative total, computed server-side at creation time.
    pub total: Cents,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// One line of an order.
///
/// `name` and `unit_price` are snapshots taken at order time and are never
/// recomputed, even if the referenced menu item changes or is deleted
/// (in which case `menu_item_id` goes null).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub menu_item_id: Option<MenuItemId>,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Cents,
    pub modifiers: Vec<OrderItemModifier>,
}

/// A modifier option selected on an order line, with its price adjustment
/// snapshotted at order time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemModifier {
    pub modifier_option_id: Option<ModifierOptionId>,
    pub name: String,
    pub price_adjustment: Cents,
}

// =============================================================================
// Input shapes
// =============================================================================

/// Payload for creating a menu item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMenuItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub price: Cents,
    #[serde(default)]
    pub allergens: Option<String>,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub modifiers: Vec<NewModifier>,
}

/// A modifier group as submitted by staff.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewModifier {
    pub name: String,
    #[serde(default)]
    pub options: Vec<NewModifierOption>,
}

/// A modifier option as submitted by staff.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewModifierOption {
    pub name: String,
    pub price_adjustment: Cents,
}

/// Field-mask update for a menu item: only supplied fields change.
///
/// Nullable text fields distinguish "absent" (keep) from "null" (clear)
/// via the double-`Option` pattern. A supplied `modifiers` list replaces
/// the item's whole modifier set atomically; partial modifier edits are
/// not supported.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<Cents>,
    #[serde(default, deserialize_with = "double_option")]
    pub allergens: Option<Option<String>>,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default)]
    pub modifiers: Option<Vec<NewModifier>>,
}

impl MenuItemUpdate {
    /// Whether the update touches any scalar column of the item row.
    #[must_use]
    pub const fn touches_item_row(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.image.is_some()
            || self.price.is_some()
            || self.allergens.is_some()
            || self.available.is_some()
    }
}

/// A fully priced order line, ready to persist.
///
/// Produced by the order engine after server-side validation and pricing;
/// never built from client-submitted amounts.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Cents,
    pub modifiers: Vec<PricedLineModifier>,
}

/// A priced modifier selection on an order line.
#[derive(Debug, Clone)]
pub struct PricedLineModifier {
    pub modifier_option_id: ModifierOptionId,
    pub name: String,
    pub price_adjustment: Cents,
}

const fn default_true() -> bool {
    true
}

/// Deserialize a nullable field so that an absent key stays `None` while an
/// explicit `null` becomes `Some(None)`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_update_absent_vs_null_description() {
        let absent: MenuItemUpdate = serde_json::from_str(r#"{"name":"Latte"}"#).unwrap();
        assert_eq!(absent.name.as_deref(), Some("Latte"));
        assert!(absent.description.is_none());

        let null: MenuItemUpdate = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(null.description, Some(None));
    }

    #[test]
    fn test_update_touches_item_row() {
        let empty = MenuItemUpdate::default();
        assert!(!empty.touches_item_row());

        let update: MenuItemUpdate = serde_json::from_str(r#"{"price":450}"#).unwrap();
        assert!(update.touches_item_row());

        // A modifiers-only update does not touch the item row itself
        let mods: MenuItemUpdate =
            serde_json::from_str(r#"{"modifiers":[{"name":"Size","options":[]}]}"#).unwrap();
        assert!(!mods.touches_item_row());
        assert!(mods.modifiers.is_some());
    }

    #[test]
    fn test_new_menu_item_defaults() {
        let item: NewMenuItem =
            serde_json::from_str(r#"{"name":"Latte","price":450}"#).unwrap();
        assert!(item.available);
        assert!(item.modifiers.is_empty());
        assert!(item.description.is_none());
    }
}
