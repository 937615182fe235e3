//! autopromo adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `amazon`: RapidAPI-backed Amazon product source
//! - `social`: Platform publishers (Instagram is live; Facebook and
//!   Pinterest are registered but disabled)
//! - `sqlite`: SQLite ledger and config store

pub mod amazon;
pub mod social;
pub mod sqlite;
