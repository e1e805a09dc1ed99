//! Domain models for the factory ledger

mod batch;
mod fund;
mod inventory;
mod material;
mod product;

pub use batch::*;
pub use fund::*;
pub use inventory::*;
pub use material::*;
pub use product::*;
