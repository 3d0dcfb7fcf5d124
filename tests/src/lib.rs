//! End-to-end scenario tests exercising `exprdag` as an external consumer
//! would, rather than the `#[cfg(test)]` unit tests living beside each
//! module inside the crate itself.

#[cfg(test)]
mod scenarios;
