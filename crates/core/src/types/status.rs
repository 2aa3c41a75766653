//! Order lifecycle status.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an [`OrderStatus`] from a string.
#[derive(thiserror::Error, Debug, Clone)]
#[error("invalid order status: {0}")]
pub struct OrderStatusError(pub String);

/// Status of an order as it moves through preparation.
///
/// `Received` is the initial state. Staff may move an order forward
/// (`Received -> Preparing -> Ready`) or backward (the explicit undo moves
/// `Ready -> Preparing` and `Preparing -> Received`); every pair of states
/// is reachable. There is no terminal state: `Ready` orders stay queryable
/// until the organization's order list is explicitly cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Received,
    Preparing,
    Ready,
}

impl OrderStatus {
    /// The wire/storage representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Preparing => "PREPARING",
            Self::Ready => "READY",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(Self::Received),
            "PREPARING" => Ok(Self::Preparing),
            "READY" => Ok(Self::Ready),
            other => Err(OrderStatusError(other.to_owned())),
        }
    }
}
