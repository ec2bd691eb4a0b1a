pub mod types;
pub mod keystore;
pub mod kdf;
pub mod cache;
pub mod cbc_mode;

pub use types::*;
pub use keystore::*;
pub use kdf::*;
pub use cache::*;
pub use cbc_mode::*;
