// Feedback aggregator: per-interview mean rating and the answer list.

pub mod aggregate;
pub mod handlers;
