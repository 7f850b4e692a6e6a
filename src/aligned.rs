// SPDX-License-Identifier: BSD-3-Clause
//
// See LICENSE at the project root for full text.

use crate::engine::Engine;
use crate::error::{resolve_index, TrajError};
use crate::sampling::Sampling;
use crate::slice::Slice;
use crate::trajectory::{FrameView, Trajectory};
use crate::virtual_trajectory::{FrameLocation, VirtualTrajectory};
use log::debug;
use nalgebra::IsometryMatrix3;

/// Default selection used to compute alignment transforms.
pub const DEFAULT_ALIGN_SELECTION: &str = "name == \"CA\"";

/// Cached per-frame transforms plus the convergence statistics of the pass
/// that produced them. Valid only while `aligned` holds; every structural
/// change (append, new align-with selection, new reference) clears the flag
/// and the next access recomputes.
struct TransformCache {
    transforms: Vec<IsometryMatrix3<f64>>,
    rmsd: f64,
    iterations: usize,
    aligned: bool,
}

impl TransformCache {
    fn new() -> Self {
        TransformCache {
            transforms: vec![],
            rmsd: 0.0,
            iterations: 0,
            aligned: false,
        }
    }

    fn invalidate(&mut self) {
        self.aligned = false;
    }
}

/// A composite trajectory whose frames come back rigid-body aligned.
///
/// Only the per-frame transform is stored; frames are transformed at access
/// time, after the owning child has refreshed its model. With a reference
/// structure set, each frame is superimposed onto it independently. With no
/// reference, the align-with subset of every frame is staged in memory and
/// the engine's iterative ensemble alignment computes a self-consistent
/// common orientation — a materially higher transient memory cost.
///
/// The alignment capability is layered over [`VirtualTrajectory`]; all the
/// index bookkeeping is shared with the plain composite.
pub struct AlignedVirtualTrajectory<E: Engine> {
    inner: VirtualTrajectory<E>,
    align_with: String,
    reference: Option<E::Structure>,
    cache: TransformCache,
}

impl<E: Engine> AlignedVirtualTrajectory<E> {
    /// Concatenates `trajectories` with the default align-with selection and
    /// no reference (iterative self-alignment).
    pub fn new(trajectories: Vec<Trajectory<E>>) -> Self {
        Self::with_sampling(trajectories, Sampling::default())
    }

    /// Same as [`AlignedVirtualTrajectory::new`] with an outer subsampling
    /// policy over the flattened enumeration.
    pub fn with_sampling(trajectories: Vec<Trajectory<E>>, sampling: Sampling) -> Self {
        AlignedVirtualTrajectory {
            inner: VirtualTrajectory::with_sampling(trajectories, sampling),
            align_with: DEFAULT_ALIGN_SELECTION.to_string(),
            reference: None,
            cache: TransformCache::new(),
        }
    }

    /// Adds a trajectory at the end. Requires re-aligning.
    pub fn append(&mut self, trajectory: Trajectory<E>) {
        self.inner.append(trajectory);
        self.cache.invalidate();
    }

    /// Changes the selection used to align with. Requires re-aligning.
    pub fn set_align_with(&mut self, selection: &str) {
        self.align_with = selection.to_string();
        self.cache.invalidate();
    }

    /// The selection currently used to align with.
    pub fn align_selection(&self) -> &str {
        &self.align_with
    }

    /// Sets (or clears) the fixed reference structure. Requires re-aligning.
    pub fn set_reference(&mut self, reference: Option<E::Structure>) {
        self.reference = reference;
        self.cache.invalidate();
    }

    /// Forwards a subset selection to every child. Does not require
    /// re-aligning: the align-with selection is independent of the returned
    /// subset.
    ///
    /// # Errors
    ///
    /// Returns an error if any child's engine rejects the selection string.
    pub fn set_subset(&mut self, selection: &str) -> Result<(), TrajError<E::Error>> {
        self.inner.set_subset(selection)
    }

    /// Whether the transform cache is valid for the current configuration.
    pub fn is_aligned(&self) -> bool {
        self.cache.aligned && !self.inner.is_stale()
    }

    /// Residual RMSD of the last alignment pass. Zero in fixed-reference
    /// mode, where no iterative refinement runs.
    pub fn rmsd(&self) -> f64 {
        self.cache.rmsd
    }

    /// Iteration count of the last alignment pass. Zero in fixed-reference
    /// mode.
    pub fn iterations(&self) -> usize {
        self.cache.iterations
    }

    /// Total number of composite frames.
    ///
    /// # Errors
    ///
    /// Same conditions as [`VirtualTrajectory::len`].
    pub fn len(&mut self) -> Result<usize, TrajError<E::Error>> {
        self.inner.len()
    }

    /// # Errors
    ///
    /// Same conditions as [`VirtualTrajectory::len`].
    pub fn is_empty(&mut self) -> Result<bool, TrajError<E::Error>> {
        self.inner.is_empty()
    }

    /// See [`VirtualTrajectory::frame_location`]. Pure bookkeeping; does not
    /// trigger an alignment pass.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::OutOfBounds`] for indices outside the composite
    /// range.
    pub fn frame_location(&mut self, i: isize) -> Result<FrameLocation, TrajError<E::Error>> {
        self.inner.frame_location(i)
    }

    pub fn trajectories(&self) -> &[Trajectory<E>] {
        self.inner.trajectories()
    }

    pub fn trajectory(&self, trajectory_index: usize) -> &Trajectory<E> {
        self.inner.trajectory(trajectory_index)
    }

    /// Computes one transform per composite frame, rebuilding the composite
    /// mapping first if needed. Called implicitly by frame access; calling it
    /// while already aligned recomputes anyway.
    ///
    /// # Errors
    ///
    /// Propagates rebuild errors and any engine failure (selection,
    /// read, superposition, ensemble alignment) unchanged.
    pub fn align(&mut self) -> Result<(), TrajError<E::Error>> {
        self.inner.ensure_fresh()?;
        let entries = self.inner.entries();
        self.cache.transforms.clear();
        self.cache.transforms.reserve(entries.len());

        match self.reference.as_ref() {
            Some(reference) => {
                // the align-with selection is re-evaluated once per distinct
                // child encountered, since the children's models may differ
                let mut selected: Option<(usize, E::Selection)> = None;
                for (local, child_index) in entries {
                    let child = self.inner.child_mut(child_index);
                    if selected.as_ref().map(|(j, _)| *j) != Some(child_index) {
                        let subset =
                            child.engine().select(child.current_model(), &self.align_with)?;
                        selected = Some((child_index, subset));
                    }
                    child.read_indexed(local)?;
                    if let Some((_, subset)) = selected.as_ref() {
                        let xform =
                            child
                                .engine()
                                .superpose(child.current_model(), subset, reference)?;
                        self.cache.transforms.push(xform);
                    }
                }
                self.cache.rmsd = 0.0;
                self.cache.iterations = 0;
                debug!(
                    "aligned {} frames against a fixed reference",
                    self.cache.transforms.len()
                );
            }
            None => {
                let mut selected: Option<(usize, E::Selection)> = None;
                let mut ensemble: Vec<E::Structure> = Vec::with_capacity(entries.len());
                let mut any_child = None;
                for &(local, child_index) in &entries {
                    let child = self.inner.child_mut(child_index);
                    if selected.as_ref().map(|(j, _)| *j) != Some(child_index) {
                        let subset =
                            child.engine().select(child.current_model(), &self.align_with)?;
                        selected = Some((child_index, subset));
                    }
                    child.read_indexed(local)?;
                    if let Some((_, subset)) = selected.as_ref() {
                        ensemble.push(child.engine().extract(child.current_model(), subset));
                    }
                    any_child = Some(child_index);
                }

                if let Some(child_index) = any_child {
                    let outcome = self
                        .inner
                        .child_mut(child_index)
                        .engine()
                        .align_ensemble(&ensemble)?;
                    debug!(
                        "iterative alignment over {} frames: rmsd {:.4} after {} iterations",
                        ensemble.len(),
                        outcome.rmsd,
                        outcome.iterations
                    );
                    self.cache.transforms = outcome.transforms;
                    self.cache.rmsd = outcome.rmsd;
                    self.cache.iterations = outcome.iterations;
                } else {
                    self.cache.rmsd = 0.0;
                    self.cache.iterations = 0;
                }
            }
        }

        self.cache.aligned = true;
        Ok(())
    }

    /// Random access; the cached transform for that composite position is
    /// applied to the child's shared subset in place after loading. Aligns
    /// first if the cache is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::OutOfBounds`], an alignment error, or the owning
    /// child's read error.
    pub fn get(&mut self, i: isize) -> Result<FrameView<'_, E>, TrajError<E::Error>> {
        self.ensure_aligned()?;
        let i = resolve_index(i, self.inner.frame_count())?;
        self.read_aligned(i)
    }

    /// Independently owned, transformed copies of every frame the slice
    /// enumerates. The cached, untransformed coordinates in the model are
    /// never mutated by a slice read.
    ///
    /// # Errors
    ///
    /// Returns an alignment error or the owning child's read error.
    pub fn slice(&mut self, s: Slice) -> Result<Vec<E::Structure>, TrajError<E::Error>> {
        self.ensure_aligned()?;
        let indices = s.indices(self.inner.frame_count());
        let mut ensemble = Vec::with_capacity(indices.len());
        for i in indices {
            let (local, child_index) = self.inner.entry(i);
            let xform = self.cache.transforms[i];
            let child = self.inner.child_mut(child_index);
            child.read_indexed(local)?;
            let mut copy = child.snapshot();
            child.engine().transform_structure(&mut copy, &xform);
            ensemble.push(copy);
        }
        Ok(ensemble)
    }

    /// Rewinds the iteration cursor to the first composite frame.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Delivers the next composite frame, aligned, or `Ok(None)` once
    /// exhausted. Beginning iteration re-aligns if the cache is invalid.
    ///
    /// # Errors
    ///
    /// Returns an alignment error or the owning child's read error.
    pub fn next_frame(&mut self) -> Result<Option<FrameView<'_, E>>, TrajError<E::Error>> {
        self.ensure_aligned()?;
        if self.inner.cursor() >= self.inner.frame_count() {
            return Ok(None);
        }
        let i = self.inner.cursor();
        self.inner.advance();
        self.read_aligned(i).map(Some)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.inner.current_index()
    }

    pub fn current_trajectory_index(&self) -> Option<usize> {
        self.inner.current_trajectory_index()
    }

    pub fn current_trajectory(&self) -> Option<&Trajectory<E>> {
        self.inner.current_trajectory()
    }

    pub fn current_frame(&self) -> Option<FrameView<'_, E>> {
        self.inner.current_frame()
    }

    fn ensure_aligned(&mut self) -> Result<(), TrajError<E::Error>> {
        // a stale composite mapping invalidates the transforms even if the
        // flag was not cleared through this type's own mutators
        if self.cache.aligned && !self.inner.is_stale() {
            return Ok(());
        }
        self.align()
    }

    fn read_aligned(&mut self, i: usize) -> Result<FrameView<'_, E>, TrajError<E::Error>> {
        let (local, child_index) = self.inner.entry(i);
        let xform = self.cache.transforms[i];
        let child = self.inner.child_mut(child_index);
        child.read_indexed(local)?;
        child.apply_transform(&xform);
        Ok(child.current_frame())
    }
}
