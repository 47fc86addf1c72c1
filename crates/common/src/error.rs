//! Arithmetic errors for amounts and prices

use thiserror::Error;

use crate::ids::AssetId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("asset {asset} does not appear in price {base}/{quote}")]
    AssetMismatch {
        asset: AssetId,
        base: AssetId,
        quote: AssetId,
    },

    #[error("cannot build a price from two amounts of the same asset {0}")]
    SameAsset(AssetId),

    #[error("price has a zero side")]
    ZeroPrice,

    #[error("amounts of {lhs} and {rhs} cannot be combined")]
    Incompatible { lhs: AssetId, rhs: AssetId },

    #[error("arithmetic overflow")]
    Overflow,
}

pub type PriceResult<T> = core::result::Result<T, PriceError>;
