//! Black-box contract harness for CRUD collection endpoints.
//!
//! The harness sequences asynchronous HTTP interactions into setup, exercise and
//! teardown phases, threads resource references between steps, and asserts on
//! responses that have not necessarily arrived yet.
//!
//! # Components
//!
//! - [`client`]: deferred HTTP client returning [`pending::Pending`] results
//! - [`fixtures`]: literal seed payloads
//! - [`locator`]: derives a resource's URL from a creation response
//! - [`expect`]: assertions on eventual status, headers and body
//! - [`suite`]: `before`/`before_each`/`after` orchestration and sequential runs
//!
//! # Configuration
//!
//! See [`config::HarnessConfig::from_env`]. The server is probed with
//! [`server::ServerConnection::connect`] before any suite runs.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod expect;
pub mod fixtures;
pub mod locator;
pub mod pending;
pub mod report;
pub mod server;
pub mod suite;

/// Everything a scenario module needs.
pub mod prelude {
    pub use crate::client::{HttpClient, Update};
    pub use crate::context::Context;
    pub use crate::error::{StepResult, TestError};
    pub use crate::expect::{expect_eventually, expect_rejection, Facet};
    pub use crate::fixtures::NewRestaurant;
    pub use crate::pending::Pending;
    pub use crate::suite::Suite;
    pub use futures::future::{BoxFuture, FutureExt};
}
