//! Engine-level integration tests

mod scenarios;
