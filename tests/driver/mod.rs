//! Driver module tests.

mod protocol_test;
