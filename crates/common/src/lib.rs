//! Shared primitives for the chain maintenance engine
//!
//! Object ids, share amounts, directed prices, fixed-point helpers and the
//! consensus constants every node must agree on. Nothing in here touches
//! chain state; all arithmetic is integer-only.

#![forbid(unsafe_code)]

pub mod asset;
pub mod constants;
pub mod error;
pub mod ids;
pub mod math;
pub mod price;
pub mod time;

pub use asset::{Asset, ShareType};
pub use error::{PriceError, PriceResult};
pub use ids::*;
pub use price::Price;
pub use time::TimePointSec;
