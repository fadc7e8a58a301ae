use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
///
/// Each identifier is its own type so an order id can never be passed where
/// a product id is expected.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of an event stream (orders, payments, stock ledger rows).
    AggregateId
);

uuid_id!(
    /// Authenticated user (customer or admin) as supplied by the auth layer.
    UserId
);

uuid_id!(
    /// Catalog product. Its stock ledger row lives in the stream with the same UUID.
    ProductId
);

uuid_id!(
    /// Line item inside an order.
    OrderItemId
);

uuid_id!(
    /// Partial cancellation or partial return record.
    AdjustmentId
);

uuid_id!(
    /// Admin-configured receiving account.
    MerchantAccountId
);

impl ProductId {
    /// Returns the id of the stock ledger stream for this product.
    pub fn stream_id(&self) -> AggregateId {
        AggregateId::from_uuid(self.0)
    }
}
