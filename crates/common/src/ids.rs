//! Typed object ids
//!
//! Every record kind gets its own id newtype so a witness id can never be
//! passed where an asset id is expected. Ids display in the dotted
//! `space.type.instance` form used by chain explorers.

use core::fmt;

use serde::{Deserialize, Serialize};

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $space:literal, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(instance: u64) -> Self {
                Self(instance)
            }

            pub const fn instance(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(instance: u64) -> Self {
                Self(instance)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}.{}", $space, $kind, self.0)
            }
        }
    };
}

object_id!(
    /// Account owning balances and orders
    AccountId, 1, 2
);
object_id!(
    /// Asset; instance 0 is the core asset
    AssetId, 1, 3
);
object_id!(ForceSettlementId, 1, 4);
object_id!(
    /// Registered block producer
    WitnessId, 1, 6
);
object_id!(LimitOrderId, 1, 7);
object_id!(CallOrderId, 1, 8);
object_id!(ProposalId, 1, 10);
object_id!(WithdrawPermissionId, 1, 12);
object_id!(BitassetDataId, 2, 4);
object_id!(AccountBalanceId, 2, 5);
object_id!(
    /// Dedup record of an applied transaction
    TransactionRecordId, 2, 7
);

impl AssetId {
    /// The chain's native asset
    pub const CORE: AssetId = AssetId(0);
}

/// Block id; the first four bytes hold the big-endian block number
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub [u8; 20]);

impl BlockId {
    /// Build an id for block `num`, filling the remaining bytes from `tag`
    pub fn new(num: u32, tag: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[..4].copy_from_slice(&num.to_be_bytes());
        bytes[4..12].copy_from_slice(&tag.to_be_bytes());
        Self(bytes)
    }

    pub fn num(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Transaction digest used for replay protection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub [u8; 20]);

impl TransactionId {
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&seed.to_be_bytes());
        Self(bytes)
    }
}
