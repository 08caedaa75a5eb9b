//! Retry module (ergonomic namespace)
//! - policy.rs: retry configuration and delay math
//! - invoker.rs: the attempt loop with terminal outcomes

pub mod invoker;
pub mod policy;

pub use invoker::*;
pub use policy::*;
