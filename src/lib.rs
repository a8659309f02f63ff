//! Core library for the Mercurio price tracker.
//!
//! Crawls marketplace search results for subscribed queries, resolves
//! listings to canonical products via title-embedding similarity and
//! maintains per-listing price histories.

pub mod config;
pub mod db;
pub mod domain;
pub mod embedding;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scraper;
pub mod services;
