//! Bearer-token authentication and the role/ownership gates handlers apply
//! after it.

pub mod extractor;
pub mod jwt;
pub mod password;

pub use extractor::CurrentUser;
pub use jwt::{Claims, TokenKind, TokenPair, TokenService};
