//! Utility module.

pub mod jwt;
pub mod pagination;
pub mod password;
pub mod rand;
pub mod slug;

pub use jwt::{gen_token, parse_token, Claims};
pub use pagination::{Page, PageParams};
pub use password::{hash_password, verify_password};
pub use rand::{gen_rand_str, RESET_TOKEN_LEN};
pub use slug::slugify;
