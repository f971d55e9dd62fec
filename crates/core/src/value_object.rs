//! Self-validating value objects.
//!
//! Value objects are **immutable** and **compared by value**: once constructed,
//! the wrapped value always satisfies its constraints. Invalid raw input fails
//! at construction time with a [`ValidationError`](crate::ValidationError),
//! never later.
//!
//! The macros in this module are the declaration surface bounded contexts use
//! for their field types:
//!
//! ```ignore
//! bounded_string!(pub CommunityName, min = 1, max = 200);
//! bounded_number!(pub Priority(i64), min = 1, max = 5);
//! enumerated_string!(pub PropertyType, allowed = ["condo", "townhouse"]);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Marker trait for value objects.
///
/// Value objects have no identity; two with the same wrapped value are equal.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Declare a trimmed, length-bounded string value object.
///
/// Bounds are inclusive and counted in `char`s after trimming. Deserialization
/// goes back through the constructor, so persisted documents are re-validated
/// on load.
#[macro_export]
macro_rules! bounded_string {
    ($(#[$meta:meta])* $vis:vis $name:ident, min = $min:expr, max = $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        $vis struct $name(String);

        impl $name {
            pub fn new(raw: &str) -> Result<Self, $crate::error::ValidationError> {
                let trimmed = raw.trim();
                let actual = trimmed.chars().count() as i64;
                if actual < $min {
                    return Err($crate::error::ValidationError::TooShort {
                        field: stringify!($name),
                        min: $min,
                        actual,
                    });
                }
                if actual > $max {
                    return Err($crate::error::ValidationError::TooLong {
                        field: stringify!($name),
                        max: $max,
                        actual,
                    });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Construct from an optional raw value; `None` is a type error
            /// (the field is required).
            pub fn from_opt(raw: Option<&str>) -> Result<Self, $crate::error::ValidationError> {
                match raw {
                    Some(s) => Self::new(s),
                    None => Err($crate::error::ValidationError::WrongType {
                        field: stringify!($name),
                        expected: "string",
                    }),
                }
            }

            /// The normalized (trimmed) value.
            pub fn value(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::error::ValidationError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::new(&raw)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl $crate::value_object::ValueObject for $name {}
    };
}

/// Declare an integer value object with an inclusive range.
///
/// A value below the minimum maps to `TooShort`, above the maximum to
/// `TooLong` (the taxonomy treats range and length bounds uniformly).
#[macro_export]
macro_rules! bounded_number {
    ($(#[$meta:meta])* $vis:vis $name:ident($ty:ty), min = $min:expr, max = $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis struct $name($ty);

        impl $name {
            pub fn new(raw: $ty) -> Result<Self, $crate::error::ValidationError> {
                if raw < $min {
                    return Err($crate::error::ValidationError::TooShort {
                        field: stringify!($name),
                        min: $min as i64,
                        actual: raw as i64,
                    });
                }
                if raw > $max {
                    return Err($crate::error::ValidationError::TooLong {
                        field: stringify!($name),
                        max: $max as i64,
                        actual: raw as i64,
                    });
                }
                Ok(Self(raw))
            }

            pub fn value(self) -> $ty {
                self.0
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(serializer)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <$ty as ::serde::Deserialize>::deserialize(deserializer)?;
                Self::new(raw).map_err(::serde::de::Error::custom)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl $crate::value_object::ValueObject for $name {}
    };
}

/// Declare a string value object restricted to a fixed set of codes.
///
/// Membership is checked after trimming; anything outside the set fails with
/// `NotInEnumeration`.
#[macro_export]
macro_rules! enumerated_string {
    ($(#[$meta:meta])* $vis:vis $name:ident, allowed = [$($code:literal),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        $vis struct $name(String);

        impl $name {
            pub const ALLOWED: &'static [&'static str] = &[$($code),+];

            pub fn new(raw: &str) -> Result<Self, $crate::error::ValidationError> {
                let trimmed = raw.trim();
                if !Self::ALLOWED.contains(&trimmed) {
                    return Err($crate::error::ValidationError::NotInEnumeration {
                        field: stringify!($name),
                        value: trimmed.to_string(),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn value(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::error::ValidationError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::new(&raw)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl $crate::value_object::ValueObject for $name {}
    };
}

/// Array value object: each element is constructed through an inner value
/// object, and the element count is capped at `MAX`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BoundedList<V, const MAX: usize> {
    items: Vec<V>,
}

impl<V, const MAX: usize> BoundedList<V, MAX> {
    /// Build the list by running every raw element through `ctor`.
    ///
    /// The first failing element aborts construction; a count above `MAX`
    /// fails with `TooLong`.
    pub fn new<I, R, F>(field: &'static str, raw: I, ctor: F) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = R>,
        F: FnMut(R) -> Result<V, ValidationError>,
    {
        let items = raw
            .into_iter()
            .map(ctor)
            .collect::<Result<Vec<_>, _>>()?;
        if items.len() > MAX {
            return Err(ValidationError::TooLong {
                field,
                max: MAX as i64,
                actual: items.len() as i64,
            });
        }
        Ok(Self { items })
    }

    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    pub fn as_slice(&self) -> &[V] {
        &self.items
    }

    pub fn iter(&self) -> core::slice::Iter<'_, V> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'de, V, const MAX: usize> Deserialize<'de> for BoundedList<V, MAX>
where
    V: Deserialize<'de>,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<V>::deserialize(deserializer)?;
        if items.len() > MAX {
            return Err(serde::de::Error::custom(ValidationError::TooLong {
                field: "list",
                max: MAX as i64,
                actual: items.len() as i64,
            }));
        }
        Ok(Self { items })
    }
}

impl<V, const MAX: usize> ValueObject for BoundedList<V, MAX> where V: Clone + PartialEq + core::fmt::Debug {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::error::ValidationError;
    use crate::value_object::BoundedList;

    bounded_string!(TestName, min = 2, max = 10);
    bounded_number!(TestPriority(i64), min = 1, max = 5);
    enumerated_string!(TestStatus, allowed = ["CREATED", "ACCEPTED", "REJECTED"]);

    #[test]
    fn bounded_string_trims_and_round_trips() {
        let name = TestName::new("  ok then  ").unwrap();
        assert_eq!(name.value(), "ok then");
    }

    #[test]
    fn bounded_string_rejects_too_short() {
        let err = TestName::new(" a ").unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooShort {
                field: "TestName",
                min: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn bounded_string_rejects_too_long() {
        let err = TestName::new("abcdefghijk").unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { actual: 11, .. }));
    }

    #[test]
    fn bounded_string_counts_chars_not_bytes() {
        // 10 chars, more than 10 bytes.
        assert!(TestName::new("éééééééééé").is_ok());
    }

    #[test]
    fn required_string_rejects_missing_value() {
        let err = TestName::from_opt(None).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { field: "TestName", .. }));
    }

    #[test]
    fn bounded_string_deserialization_revalidates() {
        let ok: Result<TestName, _> = serde_json::from_str("\"fine\"");
        assert!(ok.is_ok());
        let bad: Result<TestName, _> = serde_json::from_str("\"x\"");
        assert!(bad.is_err());
    }

    #[test]
    fn bounded_number_enforces_inclusive_range() {
        assert!(TestPriority::new(1).is_ok());
        assert!(TestPriority::new(5).is_ok());
        assert!(matches!(
            TestPriority::new(0),
            Err(ValidationError::TooShort { .. })
        ));
        assert!(matches!(
            TestPriority::new(6),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn enumerated_string_accepts_only_listed_codes() {
        assert_eq!(TestStatus::new(" ACCEPTED ").unwrap().value(), "ACCEPTED");
        let err = TestStatus::new("PENDING").unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotInEnumeration {
                field: "TestStatus",
                value: "PENDING".to_string()
            }
        );
    }

    #[test]
    fn bounded_list_validates_each_element_and_count() {
        let ok: BoundedList<TestName, 3> =
            BoundedList::new("names", ["ab", "cd"], TestName::new).unwrap();
        assert_eq!(ok.len(), 2);

        let element_err: Result<BoundedList<TestName, 3>, _> =
            BoundedList::new("names", ["ab", "x"], TestName::new);
        assert!(matches!(element_err, Err(ValidationError::TooShort { .. })));

        let count_err: Result<BoundedList<TestName, 3>, _> =
            BoundedList::new("names", ["ab", "cd", "ef", "gh"], TestName::new);
        assert!(matches!(
            count_err,
            Err(ValidationError::TooLong { field: "names", max: 3, actual: 4 })
        ));
    }

    proptest! {
        #[test]
        fn in_bounds_strings_round_trip_modulo_trim(s in "[a-z]{2,10}") {
            let name = TestName::new(&s).unwrap();
            prop_assert_eq!(name.value(), s.trim());
        }

        #[test]
        fn out_of_bounds_strings_always_fail(s in "[a-z]{11,40}") {
            prop_assert!(TestName::new(&s).is_err());
        }
    }
}
