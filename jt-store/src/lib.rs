pub mod catalog_bmc;
pub mod db;
pub mod price_bmc;

pub use catalog_bmc::*;
pub use db::*;
pub use price_bmc::*;
