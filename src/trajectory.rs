use crate::engine::Engine;
use crate::error::{resolve_index, TrajError};
use crate::sampling::Sampling;
use crate::slice::Slice;
use nalgebra::IsometryMatrix3;
use std::path::{Path, PathBuf};

/// A borrowed view of the frame most recently loaded into a trajectory's
/// model: the shared model plus the configured subset of its atoms.
///
/// The view aliases the trajectory's coordinate storage, so it cannot outlive
/// the next seek. Use [`Trajectory::snapshot`] or slicing for stable copies.
pub struct FrameView<'a, E: Engine> {
    pub model: &'a E::Model,
    pub subset: &'a E::Selection,
}

/// One native trajectory made iterable and indexable.
///
/// Wraps an engine's opened trajectory together with the coordinate model it
/// refreshes. The frame list is computed once from the [`Sampling`] policy at
/// open time; random access and iteration both go through it, so index `i`
/// always means "the i-th exposed frame", not the i-th frame of the file.
pub struct Trajectory<E: Engine> {
    engine: E,
    path: PathBuf,
    model: E::Model,
    subset: E::Selection,
    reader: E::Reader,
    framelist: Vec<usize>,
    cursor: usize,
}

impl<E: Engine> Trajectory<E> {
    /// Opens `path` against `model`, exposing every frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot open the trajectory.
    pub fn open(engine: E, path: impl AsRef<Path>, model: E::Model) -> Result<Self, TrajError<E::Error>> {
        Self::open_with(engine, path, model, &Sampling::default())
    }

    /// Opens `path` against `model` with an explicit subsampling policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot open the trajectory.
    pub fn open_with(
        engine: E,
        path: impl AsRef<Path>,
        model: E::Model,
        sampling: &Sampling,
    ) -> Result<Self, TrajError<E::Error>> {
        let path = path.as_ref().to_path_buf();
        let reader = engine.open(&path, &model)?;
        let framelist = sampling.indices(engine.frame_count(&reader));
        let subset = engine.select_all(&model);

        Ok(Trajectory {
            engine,
            path,
            model,
            subset,
            reader,
            framelist,
            cursor: 0,
        })
    }

    /// The file this trajectory was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of exposed frames (after skip/stride or explicit sampling).
    pub fn len(&self) -> usize {
        self.framelist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.framelist.is_empty()
    }

    /// Restrict the frames returned by indexing and iteration to a selection.
    /// The selection shares atoms with the model; it is a view, not a copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the selection string.
    pub fn set_subset(&mut self, selection: &str) -> Result<(), TrajError<E::Error>> {
        self.subset = self.engine.select(&self.model, selection)?;
        Ok(())
    }

    /// The real frame number behind exposed index `i`. Negative indices are
    /// relative to the end.
    ///
    /// With `skip = 50`, `frame_number(0) == 50` and `frame_number(1) == 51`.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::OutOfBounds`] if `i` falls outside the exposed range.
    pub fn frame_number(&self, i: isize) -> Result<usize, TrajError<E::Error>> {
        Ok(self.framelist[resolve_index(i, self.framelist.len())?])
    }

    /// [`Trajectory::frame_number`] over a list of indices.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::OutOfBounds`] on the first invalid index.
    pub fn frame_numbers(&self, indices: &[isize]) -> Result<Vec<usize>, TrajError<E::Error>> {
        indices.iter().map(|&i| self.frame_number(i)).collect()
    }

    /// Seeks to position `i` of the frame list, refreshes the model, and
    /// returns the subset view. This is the positional (non-negative) read
    /// the composite layer builds on.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::OutOfBounds`] for `i >= len`, or the engine's
    /// error if the read fails.
    pub fn read_indexed(&mut self, i: usize) -> Result<FrameView<'_, E>, TrajError<E::Error>> {
        if i >= self.framelist.len() {
            return Err(TrajError::OutOfBounds {
                index: i as isize,
                len: self.framelist.len(),
            });
        }
        self.engine
            .load_frame(&mut self.reader, self.framelist[i], &mut self.model)?;
        Ok(FrameView {
            model: &self.model,
            subset: &self.subset,
        })
    }

    /// Random access. Negative indices are relative to the end of the
    /// trajectory.
    ///
    /// # Errors
    ///
    /// Returns [`TrajError::OutOfBounds`] for indices outside `[-len, len)`,
    /// or the engine's error if the read fails.
    pub fn get(&mut self, i: isize) -> Result<FrameView<'_, E>, TrajError<E::Error>> {
        let i = resolve_index(i, self.framelist.len())?;
        self.read_indexed(i)
    }

    /// Reads every frame the slice enumerates and returns independently owned
    /// copies of the subset, so later repositioning cannot mutate them.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if any read fails.
    pub fn slice(&mut self, s: Slice) -> Result<Vec<E::Structure>, TrajError<E::Error>> {
        let indices = s.indices(self.framelist.len());
        let mut ensemble = Vec::with_capacity(indices.len());
        for i in indices {
            self.read_indexed(i)?;
            ensemble.push(self.engine.extract(&self.model, &self.subset));
        }
        Ok(ensemble)
    }

    /// Rewinds the iteration cursor to the first exposed frame.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Delivers the next frame, or `Ok(None)` once the sequence is exhausted.
    /// Exhaustion is not an error; the cursor stays on the last delivered
    /// frame and [`Trajectory::reset`] restarts the sequence.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the read fails.
    pub fn next_frame(&mut self) -> Result<Option<FrameView<'_, E>>, TrajError<E::Error>> {
        if self.cursor >= self.framelist.len() {
            return Ok(None);
        }
        let i = self.cursor;
        self.cursor += 1;
        self.read_indexed(i).map(Some)
    }

    /// The subset view over whatever frame is currently loaded.
    pub fn current_frame(&self) -> FrameView<'_, E> {
        FrameView {
            model: &self.model,
            subset: &self.subset,
        }
    }

    /// The shared model this trajectory refreshes.
    pub fn current_model(&self) -> &E::Model {
        &self.model
    }

    /// Exposed index of the most recently delivered frame, `None` before the
    /// first delivery. After exhaustion this stays on the last frame.
    pub fn current_index(&self) -> Option<usize> {
        self.cursor.checked_sub(1)
    }

    /// Real frame number of the most recently delivered frame.
    pub fn current_real_index(&self) -> Option<usize> {
        self.current_index().map(|i| self.framelist[i])
    }

    /// An independently owned copy of the current subset.
    pub fn snapshot(&self) -> E::Structure {
        self.engine.extract(&self.model, &self.subset)
    }

    pub(crate) fn engine(&self) -> &E {
        &self.engine
    }

    pub(crate) fn apply_transform(&mut self, xform: &IsometryMatrix3<f64>) {
        self.engine.transform_model(&mut self.model, &self.subset, xform);
    }
}
