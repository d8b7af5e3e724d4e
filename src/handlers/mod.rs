// handlers/mod.rs - Handler tiers
//
// Public (no auth) → Protected (bearer token, principal in extensions).
// Protected handlers under /initial additionally pass the CSRF guard.
pub mod public;
pub mod protected;
