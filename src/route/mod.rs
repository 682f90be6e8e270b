//! URL grammar for thumbnail requests.
//!
//! A thumbnail URL is an ordinary image URL with a suffix describing the
//! thumbnail:
//!
//! ```text
//! /media/photo_50x100-sw@2x.jpg
//!        │     │      │  │  └─ extension (optional)
//!        │     │      │  └──── retina multiplier (optional)
//!        │     │      └─────── gravity (optional)
//!        │     └────────────── dimensions: WxH, Wx or xH
//!        └──────────────────── source name
//! ```
//!
//! In signed mode a `-<hex>` signature follows the gravity.

mod grammar;
mod gravity;

pub use grammar::{ParsedRequest, RoutePattern, RouteTable, UrlSelector};
pub use gravity::Gravity;
