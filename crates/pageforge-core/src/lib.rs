//! Core library for `PageForge`.
//!
//! Contains the cryptographic primitives, password hashing, encrypted user
//! store, session table, page/stylesheet/layout stores, page renderer, and
//! the typed admin commands. This crate depends on `pageforge-storage` for
//! the storage backend trait and knows nothing about HTTP.

pub mod command;
pub mod crypto;
pub mod error;
pub mod layout;
pub mod pages;
pub mod password;
pub mod render;
pub mod session;
pub mod styles;
pub mod users;
