// SPDX-License-Identifier: BSD-3-Clause
//
// See LICENSE at the project root for full text.

use nalgebra::IsometryMatrix3;
use std::path::Path;

/// Outcome of an iterative ensemble alignment: one rigid-body transform per
/// staged structure, the residual RMSD at convergence, and how many
/// refinement passes the engine needed.
#[derive(Debug, Clone)]
pub struct EnsembleAlignment {
    pub transforms: Vec<IsometryMatrix3<f64>>,
    pub rmsd: f64,
    pub iterations: usize,
}

/// The seam to the native molecular-dynamics toolkit.
///
/// Everything numerically or algorithmically heavy happens behind this trait:
/// trajectory parsing, coordinate refresh, atom selection, superposition, and
/// iterative ensemble alignment. The crate's own types only do index
/// bookkeeping and sequence these calls.
///
/// A `Model` is the engine's in-memory coordinate set for one system. It is
/// shared state: refreshing coordinates from a frame mutates the model in
/// place, and every `Selection` taken from it observes the new coordinates.
/// `extract` is the only way to obtain a stable snapshot.
pub trait Engine {
    type Error: std::error::Error + 'static;
    /// An opened trajectory, positioned by [`Engine::load_frame`].
    type Reader;
    /// The mutable atom-coordinate model a trajectory refreshes.
    type Model;
    /// A subset of a model's atoms, sharing the model's storage.
    type Selection;
    /// An independently owned copy of a selection's atoms.
    type Structure;

    /// Opens the trajectory at `path` against `model`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or does not match the
    /// model.
    fn open(&self, path: &Path, model: &Self::Model) -> Result<Self::Reader, Self::Error>;

    /// Total number of frames in the opened trajectory.
    fn frame_count(&self, reader: &Self::Reader) -> usize;

    /// Seeks to the real frame number `frame` and refreshes `model`'s
    /// coordinates from it.
    ///
    /// # Errors
    ///
    /// Returns an error on a failed read, including a seek past end-of-file.
    fn load_frame(
        &self,
        reader: &mut Self::Reader,
        frame: usize,
        model: &mut Self::Model,
    ) -> Result<(), Self::Error>;

    /// Evaluates a selection string over the model's atoms.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection is malformed.
    fn select(&self, model: &Self::Model, selection: &str) -> Result<Self::Selection, Self::Error>;

    /// The whole-model selection.
    fn select_all(&self, model: &Self::Model) -> Self::Selection;

    /// Copies the selected atoms into an independently owned structure.
    fn extract(&self, model: &Self::Model, subset: &Self::Selection) -> Self::Structure;

    /// Computes the rigid-body transform that best superimposes the selected
    /// atoms onto `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if the superposition is singular or the atom counts
    /// are incompatible.
    fn superpose(
        &self,
        model: &Self::Model,
        subset: &Self::Selection,
        reference: &Self::Structure,
    ) -> Result<IsometryMatrix3<f64>, Self::Error>;

    /// Runs iterative alignment over the whole ensemble, returning one
    /// transform per structure plus the convergence statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine's refinement fails to run.
    fn align_ensemble(
        &self,
        ensemble: &[Self::Structure],
    ) -> Result<EnsembleAlignment, Self::Error>;

    /// Applies `xform` to the selected atoms of `model`, in place.
    fn transform_model(
        &self,
        model: &mut Self::Model,
        subset: &Self::Selection,
        xform: &IsometryMatrix3<f64>,
    );

    /// Applies `xform` to an owned structure's coordinates, in place.
    fn transform_structure(&self, structure: &mut Self::Structure, xform: &IsometryMatrix3<f64>);
}
