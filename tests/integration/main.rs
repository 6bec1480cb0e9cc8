//! Workspace integration tests over the in-memory backends.

mod helpers;

mod api_test;
mod contention_test;
mod ledger_failure_test;
mod lifecycle_test;
mod reconcile_test;
