//! Smartmedia-DB: Database schema, migrations, and query operations
//!
//! This crate provides conversion tracking persistence using SQLite
//! with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use smartmedia_db::pool::{init_pool, get_conn};
//! use smartmedia_db::queries::conversions;
//! use smartmedia_common::ConversionStatus;
//!
//! let pool = init_pool("/var/lib/smartmedia/db.sqlite").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let pending = conversions::list_by_status(&conn, ConversionStatus::Accepted, 10).unwrap();
//! println!("{} conversions waiting for dispatch", pending.len());
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
