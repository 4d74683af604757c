//! Integration harness for the storefront service.
//!
//! - [`compose`]: bring docker compose services up and down, resolve their
//!   published ports and wait for them to become healthy
//! - [`lease`]: host-wide exclusive lease serialising compose operations
//! - [`bag`]: values captured from responses, substituted into later requests
//! - [`webtest`]: scripted HTTP driver with status and body expectations
//! - [`scenario`]: ordered runs of driver cases with a readable report
//! - [`dotenv`]: `.env` loading for compose credentials

pub mod bag;
pub mod compose;
pub mod dotenv;
pub mod env;
pub mod lease;
pub mod scenario;
pub mod stopwatch;
pub mod webtest;

pub use bag::{Bag, Mode};
pub use compose::{Compose, ComposeError, Container};
pub use dotenv::{DotenvError, EnvFile};
pub use lease::{Lease, LeaseError, LeaseGuard};
pub use scenario::{CaseOutcome, CaseResult, Scenario, ScenarioReport};
pub use stopwatch::Stopwatch;
pub use webtest::{
    free_port, random_name, CaseReport, Expectation, JsonComparison, Mismatch, Payload,
    PlaceholderPolicy, TestCase, WebTest, WebTestError,
};
