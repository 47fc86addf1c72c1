//! Chain state records and their secondary indexes

/// Wire a record kind into the object store
macro_rules! impl_object {
    ($ty:ty, $id:ty, $index:ty, $kind:literal) => {
        impl keeper_store::Object for $ty {
            type Id = $id;
            type Index = $index;
            const KIND: &'static str = $kind;

            fn id(&self) -> $id {
                self.id
            }
        }
    };
}

pub(crate) use impl_object;

mod asset;
mod balance;
mod global;
mod market;
mod proposal;
mod witness;

pub use asset::*;
pub use balance::*;
pub use global::*;
pub use market::*;
pub use proposal::*;
pub use witness::*;
