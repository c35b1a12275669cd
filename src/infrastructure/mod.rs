pub mod auth;
pub mod pg;
