// handlers/protected/auth/mod.rs - Account handlers for authenticated principals

pub mod me; // GET /jwt/auth/users/me/, GET /jwt/auth/status/
pub mod member; // PUT /jwt/auth/users/:username

pub use me::{status_get, users_me_get};
pub use member::member_put;
