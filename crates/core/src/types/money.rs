//! Integral money amounts in minor currency units.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

/// A money amount in minor currency units (e.g. cents).
///
/// All prices in Stallfront are integral minor-unit amounts in a single
/// currency. Amounts may be negative: modifier options carry signed price
/// adjustments (e.g. "Small: -50").
///
/// ## Examples
///
/// ```
/// use stallfront_core::Cents;
///
/// let latte = Cents::new(450);
/// let large = Cents::new(100);
/// assert_eq!(latte + large, Cents::new(550));
/// assert_eq!((latte + large) * 2, Cents::new(1100));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Create a new amount from minor units.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the underlying minor-unit value.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Whether the amount is negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Add two amounts, returning `None` on overflow.
    ///
    /// Order pricing uses this instead of `+` so that untrusted inputs
    /// can never wrap an amount.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(amount) => Some(Self(amount)),
            None => None,
        }
    }

    /// Multiply an amount by a count, returning `None` on overflow.
    #[must_use]
    pub const fn checked_mul(self, rhs: i64) -> Option<Self> {
        match self.0.checked_mul(rhs) {
            Some(amount) => Some(Self(amount)),
            None => None,
        }
    }
}

impl Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Cents {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

impl From<Cents> for i64 {
    fn from(amount: Cents) -> Self {
        amount.0
    }
}

#[cfg(feature = "sqlite")]
impl sqlx::Type<sqlx::Sqlite> for Cents {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

#[cfg(feature = "sqlite")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Cents {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(amount))
    }
}

#[cfg(feature = "sqlite")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Cents {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_mul() {
        let unit = Cents::new(450) + Cents::new(100);
        assert_eq!(unit, Cents::new(550));
        assert_eq!(unit * 2, Cents::new(1100));
    }

    #[test]
    fn test_negative_adjustment() {
        let unit = Cents::new(450) + Cents::new(-50);
        assert_eq!(unit, Cents::new(400));
        assert!(Cents::new(-50).is_negative());
        assert!(!Cents::ZERO.is_negative());
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(
            Cents::new(450).checked_add(Cents::new(100)),
            Some(Cents::new(550))
        );
        assert_eq!(Cents::new(550).checked_mul(2), Some(Cents::new(1100)));

        assert_eq!(Cents::new(i64::MAX).checked_add(Cents::new(1)), None);
        assert_eq!(Cents::new(i64::MAX).checked_mul(2), None);
        assert_eq!(Cents::new(2).checked_mul(i64::MAX), None);
    }

    #[test]
    fn test_sum() {
        let total: Cents = [Cents::new(100), Cents::new(250)].into_iter().sum();
        assert_eq!(total, Cents::new(350));
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&Cents::new(450)).unwrap();
        assert_eq!(json, "450");

        let parsed: Cents = serde_json::from_str("-100").unwrap();
        assert_eq!(parsed, Cents::new(-100));
    }
}
