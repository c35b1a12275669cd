//! Postgres-backed persistence service for a todo list, exposed over a
//! small REST surface.
//!
//! The storage core lives in [`domain`] (entity, repository contract and
//! error taxonomy) and [`infrastructure`] (connection establishment under
//! two authentication modes, idempotent schema bootstrap, CRUD). [`http`]
//! is the thin axum edge that invokes the storage operations and
//! serializes results to JSON; [`config`] carries the environment-derived
//! settings.

pub mod config;
pub mod domain;
pub mod http;
pub mod infrastructure;
