//! Tests for the verification flow

pub(crate) mod mocks;
