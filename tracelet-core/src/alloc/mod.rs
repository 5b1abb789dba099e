//! ## tracelet-core::alloc
//! **Fixed object pools**
//!
//! ### Expectations (Production):
//! - Zero heap allocations after pool construction
//! - Objects reused in place, never rebuilt
//! - Allocation failure reported as a value, never a panic
//!
//! ### Key Submodules:
//! - `pool/`: N-slot pool with an atomic occupancy bitmap

pub mod pool;

pub use pool::{FixedPool, SlotId};
