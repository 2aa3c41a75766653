//! Organization slug type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum SlugError {
    /// The input string is empty.
    #[error("slug cannot be empty")]
    Empty,
    /// The input string is too short.
    #[error("slug must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input string is too long.
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[a-z0-9-]`.
    #[error("slug must contain only lowercase letters, numbers, and hyphens")]
    InvalidCharacter,
}

/// A URL-safe organization identifier.
///
/// The slug is the public name of a tenant: it appears in every
/// customer-facing URL and in session credentials. It is distinct from the
/// organization's internal numeric id.
///
/// ## Constraints
///
/// - Length: 3-50 characters
/// - Characters: lowercase ASCII letters, digits, and hyphens
///
/// Matching is exact and case-sensitive; [`Slug::normalize`] lowercases
/// input before validation and is what registration uses, so stored slugs
/// are always already lowercase.
///
/// ## Examples
///
/// ```
/// use stallfront_core::Slug;
///
/// assert!(Slug::parse("joes-coffee").is_ok());
/// assert!(Slug::parse("Joes-Coffee").is_err()); // uppercase
/// assert_eq!(Slug::normalize(" Joes-Coffee ").unwrap().as_str(), "joes-coffee");
/// assert!(Slug::parse("ab").is_err()); // too short
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Minimum length of a slug.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum length of a slug.
    pub const MAX_LENGTH: usize = 50;

    /// Parse a `Slug` from a string without altering it.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, outside the 3-50 character
    /// range, or contains a character other than `[a-z0-9-]`.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }

        if s.len() < Self::MIN_LENGTH {
            return Err(SlugError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(SlugError::InvalidCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Normalize registration input (trim + lowercase), then parse.
    ///
    /// # Errors
    ///
    /// Same as [`Slug::parse`], applied to the normalized form.
    pub fn normalize(s: &str) -> Result<Self, SlugError> {
        Self::parse(&s.trim().to_ascii_lowercase())
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with sqlite feature)
#[cfg(feature = "sqlite")]
impl sqlx::Type<sqlx::Sqlite> for Slug {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

#[cfg(feature = "sqlite")]
impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Slug {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "sqlite")]
impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Slug {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode(self.0.clone(), buf)
    }
}
