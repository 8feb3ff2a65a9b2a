//! Type definitions for the scoring pipeline

pub mod transaction;
pub mod verdict;

pub use transaction::{encode_type, TransactionType, ValidatedTransaction};
pub use verdict::{ScoredTransaction, Verdict, VerdictStatus};
