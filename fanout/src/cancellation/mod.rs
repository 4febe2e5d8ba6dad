//! Cooperative, per-call cancellation.

mod token;

pub use token::CancellationToken;
