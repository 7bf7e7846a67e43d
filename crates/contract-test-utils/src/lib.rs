//! # Contract Test Utilities
//!
//! Shared test utilities for the contract harness.
//!
//! This crate provides:
//! - An in-process fake restaurant collection server (`TestCrudServer`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use contract_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestCrudServer::spawn(ServerBehavior::default()).await?;
//!
//!     let response = reqwest::get(server.url()).await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

// Re-export commonly used items
pub use server_harness::*;
