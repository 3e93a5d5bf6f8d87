//! Strongly-typed identifiers used across the back office.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::validation(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of a back-office user (the actor behind soft deletes and approvals).
    UserId,
    "UserId"
);
uuid_newtype!(
    /// Identifier of a stock lot.
    LotId,
    "LotId"
);
uuid_newtype!(ProductId, "ProductId");
uuid_newtype!(ProductCategoryId, "ProductCategoryId");
uuid_newtype!(AssemblyCategoryId, "AssemblyCategoryId");
uuid_newtype!(PaymentMethodId, "PaymentMethodId");
uuid_newtype!(WorkerId, "WorkerId");
uuid_newtype!(ClientId, "ClientId");
uuid_newtype!(OrderId, "OrderId");
uuid_newtype!(OrderLineId, "OrderLineId");
uuid_newtype!(
    /// Identifier of an order line that sells a finished assembly.
    AssemblySaleLineId,
    "AssemblySaleLineId"
);
uuid_newtype!(AssemblyId, "AssemblyId");
uuid_newtype!(AssemblyLineId, "AssemblyLineId");
uuid_newtype!(
    /// Identifier of a return record (order-line, assembly-line or assembly-sale).
    ReturnId,
    "ReturnId"
);
uuid_newtype!(PaymentId, "PaymentId");
uuid_newtype!(LedgerEntryId, "LedgerEntryId");
uuid_newtype!(ApprovalRequestId, "ApprovalRequestId");
