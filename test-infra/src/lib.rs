/*!

`test-infra` drives end-to-end installations against the assisted installer service. A
[`TestEnvironment`] provisions nodes through a node controller, creates a [`Cluster`], runs one
[`Scenario`] and, when the scenario fails, collects the service and node logs before tearing
everything down.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use cluster::Cluster;
pub use error::{Error, Result};
pub use logs::LogCollector;
pub use nodes::Nodes;
pub use scenarios::{Scenario, TestEnvironment, TestSettings};

mod cluster;
mod error;
mod logs;
mod nodes;
mod scenarios;
