//! Test utilities shared by the service test suites.

mod context;

pub(crate) use context::TestContext;
pub(crate) use db::TestDb;
