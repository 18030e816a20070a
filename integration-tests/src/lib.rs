//! End-to-end tests against a deployed items stack live in `tests/`.
//! They are ignored by default; run them with `cargo test -- --ignored`
//! once the stack is deployed.
