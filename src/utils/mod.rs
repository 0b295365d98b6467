pub mod clock;
pub mod identity_cache;
