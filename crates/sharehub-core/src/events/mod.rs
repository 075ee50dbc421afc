//! Domain events emitted by share operations.
//!
//! Events are observation-only: they are handed to registered observers
//! after the corresponding provider call succeeded. The cancelable
//! "before" phase is not an event — it is the guard contract defined by
//! the service layer, which returns an explicit verdict.

pub mod share;

pub use share::ShareEvent;
