use keeper_common::{AccountId, WitnessId};
use serde::Serialize;

use super::impl_object;

/// A registered block producer
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Witness {
    pub id: WitnessId,
    pub witness_account: AccountId,
    /// Absolute slot of the last block this witness signed
    pub last_aslot: u64,
    /// Lifetime count of scheduled slots left empty
    pub total_missed: u32,
    pub last_confirmed_block_num: u32,
}

impl_object!(Witness, WitnessId, (), "witness");
