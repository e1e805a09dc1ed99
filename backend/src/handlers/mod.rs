//! HTTP request handlers

pub mod batch;
pub mod fund;
pub mod health;
pub mod inventory;
pub mod material;
pub mod notification;
pub mod product;
pub mod purchase;

pub use batch::*;
pub use fund::*;
pub use health::*;
pub use inventory::*;
pub use material::*;
pub use notification::*;
pub use product::*;
pub use purchase::*;
