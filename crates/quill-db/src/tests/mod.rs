//! Postgres integration tests.
//!
//! All tests here need a migrated database reachable via `DATABASE_URL`
//! and are `#[ignore]`d so plain `cargo test` stays green without one.

mod brainstorm_tests;
mod document_versioning_tests;
mod planning_tests;
mod reference_tag_tests;
