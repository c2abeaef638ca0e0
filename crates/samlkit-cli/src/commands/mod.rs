//! Command implementations.

pub mod decode;
pub mod keygen;
pub mod login;
pub mod logout;
pub mod metadata;
pub mod sp_metadata;

pub use decode::run_decode;
pub use keygen::run_keygen;
pub use login::run_login;
pub use logout::run_logout;
pub use metadata::run_metadata;
pub use sp_metadata::run_sp_metadata;
