// SPDX-License-Identifier: BSD-3-Clause
//
// See LICENSE at the project root for full text.

use crate::engine::Engine;
use crate::error::{resolve_index, TrajError};
use crate::sampling::Sampling;
use crate::slice::Slice;
use crate::trajectory::{FrameView, Trajectory};
use log::debug;

/// Where a composite frame comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLocation {
    /// Index into the owning child's exposed frame list.
    pub frame_index: usize,
    /// Index of the owning child in the trajectory list.
    pub trajectory_index: usize,
    /// Real frame number within the owning child's file.
    pub real_frame: usize,
}

/// The lazily rebuilt composite mapping: for each global position, which
/// child owns it and which of that child's exposed frames it is. The two
/// vectors are always the same length. Any structural change (appending a
/// child) marks the mapping stale; it is rebuilt on first access.
struct CompositeIndex {
    frame_in_trajectory: Vec<usize>,
    trajectory_of: Vec<usize>,
    stale: bool,
}

impl CompositeIndex {
    fn new() -> Self {
        CompositeIndex {
            frame_in_trajectory: vec![],
            trajectory_of: vec![],
            stale: true,
        }
    }

    fn len(&self) -> usize {
        self.frame_in_trajectory.len()
    }
}

/// Several trajectories concatenated into one indexable sequence.
///
/// Frames are enumerated trajectory-major: all of child 0's exposed frames
/// precede all of child 1's, and so on. Skips and strides configured on the
/// children are honored; an outer [`Sampling`] is then applied over the
/// flattened enumeration. The children need not share a model or a subset
/// selection, though the frames they return should be compatible.
pub struct VirtualTrajectory<E: Engine> {
    trajectories: Vec<Trajectory<E>>,
    sampling: Sampling,
    index: CompositeIndex,
    cursor: usize,
}

impl<E: Engine> VirtualTrajectory<E> {
    /// Concatenates `trajectories`, exposing every flattened frame.
    pub fn new(trajectories: Vec<Trajectory<E>>) -> Self {
        Self::with_sampling(trajectories, Sampling::default())
    }

    /// Concatenates `trajectories` with an outer subsampling policy applied
    /// over the flattened enumeration.
    pub fn with_sampling(trajectories: Vec<Trajectory<E>>, sampling: Sampling) -> Self {
        VirtualTrajectory {
            trajectories,
            sampling,
            index: CompositeIndex::new(),
            cursor: 0,
        }
    }

    /// Adds a trajectory at the end. Invalidates the composite mapping.
    pub fn append(&mut self, trajectory: Trajectory<E>) {
        self.trajectories.push(trajectory);
        self.index.stale = true;
    }

    /// Forwards a subset selection to every child. Frame counts are
    /// unaffected, so the composite mapping stays valid.
    ///
    /// # Errors
    ///
    /// Returns an error if any child's engine rejects the selection string.
    pub fn set_subset(&mut self, selection: &str) -> Result<(), TrajError<E::Error>> {
        for t in &mut self.trajectories {
            t.set_subset(selection)?;
        }
        Ok(())
    }

    /// The managed trajectories, in order.
    pub fn trajectories(&self) -> &[Trajectory<E>] {
        &self.trajectories
    }

    /// The child at `trajectory_index` (as reported by
    /// [`VirtualTrajectory::frame_location`]).
    pub fn trajectory(&self, trajectory_index: usize) -> &Trajectory<E> {
        &self.trajectories[trajectory_index]
    }

    /// Total number of composite frames. Rebuilds the mapping if stale.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::OutOfBounds`] if an explicit outer sampling
    /// references a position past the flattened enumeration.
    pub fn len(&mut self) -> Result<usize, TrajError<E::Error>> {
        self.ensure_fresh()?;
        Ok(self.index.len())
    }

    /// # Errors
    ///
    /// Same conditions as [`VirtualTrajectory::len`].
    pub fn is_empty(&mut self) -> Result<bool, TrajError<E::Error>> {
        Ok(self.len()? == 0)
    }

    /// Resolves composite position `i` (negative indices relative to the end)
    /// to its owning child and real frame number.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::OutOfBounds`] for indices outside the composite
    /// range.
    pub fn frame_location(&mut self, i: isize) -> Result<FrameLocation, TrajError<E::Error>> {
        self.ensure_fresh()?;
        let i = resolve_index(i, self.index.len())?;
        let frame_index = self.index.frame_in_trajectory[i];
        let trajectory_index = self.index.trajectory_of[i];
        let real_frame = self.trajectories[trajectory_index].frame_number(frame_index as isize)?;

        Ok(FrameLocation {
            frame_index,
            trajectory_index,
            real_frame,
        })
    }

    /// Random access over the composite sequence, delegating the read to the
    /// owning child. Negative indices are relative to the end.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::OutOfBounds`] or the owning child's read error.
    pub fn get(&mut self, i: isize) -> Result<FrameView<'_, E>, TrajError<E::Error>> {
        self.ensure_fresh()?;
        let i = resolve_index(i, self.index.len())?;
        self.read_entry(i)
    }

    /// Independently owned copies of every frame the slice enumerates.
    ///
    /// # Errors
    ///
    /// Returns the owning child's error if any read fails.
    pub fn slice(&mut self, s: Slice) -> Result<Vec<E::Structure>, TrajError<E::Error>> {
        self.ensure_fresh()?;
        let indices = s.indices(self.index.len());
        let mut ensemble = Vec::with_capacity(indices.len());
        for i in indices {
            let (local, child) = self.entry(i);
            let t = &mut self.trajectories[child];
            t.read_indexed(local)?;
            ensemble.push(t.snapshot());
        }
        Ok(ensemble)
    }

    /// Rewinds the iteration cursor to the first composite frame.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Delivers the next composite frame, or `Ok(None)` once exhausted.
    ///
    /// # Errors
    ///
    /// Returns a rebuild error or the owning child's read error.
    pub fn next_frame(&mut self) -> Result<Option<FrameView<'_, E>>, TrajError<E::Error>> {
        self.ensure_fresh()?;
        if self.cursor >= self.index.len() {
            return Ok(None);
        }
        let i = self.cursor;
        self.cursor += 1;
        self.read_entry(i).map(Some)
    }

    /// Composite index of the most recently delivered frame, `None` before
    /// the first delivery.
    pub fn current_index(&self) -> Option<usize> {
        self.cursor.checked_sub(1)
    }

    /// Which child produced the most recently delivered frame. After
    /// exhaustion this stays on the last frame's child.
    pub fn current_trajectory_index(&self) -> Option<usize> {
        self.current_entry().map(|i| self.index.trajectory_of[i])
    }

    /// The child that produced the most recently delivered frame.
    pub fn current_trajectory(&self) -> Option<&Trajectory<E>> {
        self.current_trajectory_index().map(|j| &self.trajectories[j])
    }

    /// The subset view of the most recently delivered frame.
    pub fn current_frame(&self) -> Option<FrameView<'_, E>> {
        self.current_trajectory().map(|t| t.current_frame())
    }

    fn current_entry(&self) -> Option<usize> {
        if self.index.stale {
            return None;
        }
        let last = self.cursor.checked_sub(1)?;
        Some(last.min(self.index.len().checked_sub(1)?))
    }

    fn read_entry(&mut self, i: usize) -> Result<FrameView<'_, E>, TrajError<E::Error>> {
        let (local, child) = self.entry(i);
        self.trajectories[child].read_indexed(local)
    }

    pub(crate) fn ensure_fresh(&mut self) -> Result<(), TrajError<E::Error>> {
        if self.index.stale {
            self.rebuild()?;
        }
        Ok(())
    }

    /// Flattens the children trajectory-major, frame-minor, then applies the
    /// outer sampling over that enumeration. Explicit outer positions are
    /// bounds-checked here, at first access, not at configuration time.
    fn rebuild(&mut self) -> Result<(), TrajError<E::Error>> {
        let mut frames = Vec::new();
        let mut trajs = Vec::new();
        for (j, t) in self.trajectories.iter().enumerate() {
            for i in 0..t.len() {
                frames.push(i);
                trajs.push(j);
            }
        }

        let n = frames.len();
        self.index.frame_in_trajectory.clear();
        self.index.trajectory_of.clear();
        for i in self.sampling.indices(n) {
            if i >= n {
                return Err(TrajError::OutOfBounds {
                    index: i as isize,
                    len: n,
                });
            }
            self.index.frame_in_trajectory.push(frames[i]);
            self.index.trajectory_of.push(trajs[i]);
        }

        debug!(
            "rebuilt composite index: {} trajectories, {} frames exposed of {} flattened",
            self.trajectories.len(),
            self.index.len(),
            n
        );
        self.cursor = 0;
        self.index.stale = false;
        Ok(())
    }

    pub(crate) fn is_stale(&self) -> bool {
        self.index.stale
    }

    /// Composite frame count without a freshness check. Callers must have run
    /// [`VirtualTrajectory::ensure_fresh`] first.
    pub(crate) fn frame_count(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn entry(&self, i: usize) -> (usize, usize) {
        (
            self.index.frame_in_trajectory[i],
            self.index.trajectory_of[i],
        )
    }

    pub(crate) fn entries(&self) -> Vec<(usize, usize)> {
        self.index
            .frame_in_trajectory
            .iter()
            .copied()
            .zip(self.index.trajectory_of.iter().copied())
            .collect()
    }

    pub(crate) fn child_mut(&mut self, trajectory_index: usize) -> &mut Trajectory<E> {
        &mut self.trajectories[trajectory_index]
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
    }
}
