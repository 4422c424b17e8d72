//! Core judging types

pub mod verdict;

pub use verdict::{classify, ClassificationPolicy, Verdict};
