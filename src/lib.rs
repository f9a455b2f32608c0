//! Discount Engine - Order-Time Coupon Redemption
//!
//! This crate decides whether a discount code may be applied to a pending
//! order, computes the discount amount, and durably records the redemption
//! so usage limits hold even under concurrent checkout requests.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
