//! Iterable, indexable views over molecular-dynamics trajectories.
//!
//! The native engine behind the [`engine::Engine`] trait does all the heavy
//! lifting (file parsing, coordinate refresh, selection, superposition,
//! iterative ensemble alignment); this crate owns the index bookkeeping:
//! skip/stride subsampling, negative indexing, slicing with independent
//! copies, concatenation of trajectories into one composite sequence, and
//! lazy caching of per-frame alignment transforms.

pub mod aligned;
pub mod engine;
pub mod error;
pub mod sampling;
pub mod slice;
pub mod trajectory;
pub mod virtual_trajectory;

#[cfg(test)]
pub(crate) mod testutil;
