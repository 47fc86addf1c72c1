use keeper_common::{BlockId, TimePointSec, TransactionId, WitnessId};
use serde::{Deserialize, Serialize};

/// Transaction as far as replay protection is concerned
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub id: TransactionId,
    pub expiration: TimePointSec,
}

/// Block header fields the maintenance pass consumes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub previous: BlockId,
    pub timestamp: TimePointSec,
    pub witness: WitnessId,
    #[serde(default)]
    pub transactions: Vec<SignedTransaction>,
}

impl SignedBlock {
    pub fn block_num(&self) -> u32 {
        self.previous.num() + 1
    }

    pub fn id(&self) -> BlockId {
        BlockId::new(self.block_num(), self.digest())
    }

    /// Deterministic stand-in for the header hash
    fn digest(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mut mix = |v: u64| {
            for byte in v.to_be_bytes() {
                h ^= byte as u64;
                h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(self.timestamp.secs() as u64);
        mix(self.witness.instance());
        mix(u64::from_be_bytes([
            self.previous.0[4],
            self.previous.0[5],
            self.previous.0[6],
            self.previous.0[7],
            self.previous.0[8],
            self.previous.0[9],
            self.previous.0[10],
            self.previous.0[11],
        ]));
        for trx in &self.transactions {
            mix(trx.expiration.secs() as u64);
        }
        h
    }
}
