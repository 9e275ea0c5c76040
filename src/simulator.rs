//! Balance simulator for Sweet Success.
//! Run with: cargo test -p sweet-success simulate_greedy -- --nocapture
