//! Concrete restaurant collection scenarios.

pub mod cors;
pub mod create;
pub mod delete;
pub mod update;

use contract_harness::suite::Suite;

/// Every scenario, in the order they run.
pub fn all() -> Vec<Suite> {
    vec![
        cors::suite(),
        create::suite(),
        update::suite(),
        delete::suite(),
    ]
}
