//! Strongly typed identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "` from a string")]
            #[must_use]
            pub const fn new(id: String) -> Self {
                Self(id)
            }

            #[doc = concat!("Creates a random `", stringify!($name), "` (UUID v4)")]
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Returns the inner string value
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a manuscript in the writing service
    ManuscriptId
);
string_id!(
    /// Identifier of an author
    AuthorId
);
string_id!(
    /// Identifier of a published book
    BookId
);
string_id!(
    /// Identifier of a subscriber
    UserId
);
string_id!(
    /// Identifier of a book subscription
    SubscriptionId
);
string_id!(
    /// Identifier of a book review
    ReviewId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_inner_value() {
        let id = ManuscriptId::new("m-42".to_string());
        assert_eq!(id.to_string(), "m-42");
        assert_eq!(id.as_str(), "m-42");
        assert_eq!(ManuscriptId::from("m-42"), id);
    }

    #[test]
    fn generated_ids_are_unique_uuids() {
        let a = BookId::generate();
        let b = BookId::generate();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
    }
}
