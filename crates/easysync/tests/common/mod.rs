#![allow(dead_code)]

pub mod fuzzer;
pub mod generators;

pub use fuzzer::{seeds, Fuzzer};
pub use generators::{random_multiline, random_test_changeset, two_prop_pool};

pub fn lines(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}
