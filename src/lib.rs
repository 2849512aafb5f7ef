//! Vitrine - multi-tenant storefront backend
//!
//! This library provides the core functionality for Vitrine: store accounts,
//! product/collection catalogs with shareable links, tiered plan entitlements,
//! and Stripe subscription lifecycle reconciliation.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod email;
pub mod entitlements;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod payments;
