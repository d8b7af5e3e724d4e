// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, registration and CSRF cookie minting. Registration
// and CSRF minting are gated by shared-secret headers instead of a token.
pub mod auth;
