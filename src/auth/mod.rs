pub mod extract;
pub mod password;
pub mod session;

pub use extract::{ApiAdmin, ApiUser, PageAdmin, PageUser};
pub use password::{burn_verification, hash_password, verify_password};
pub use session::{Session, SessionKeys};
