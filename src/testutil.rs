//! A deterministic in-memory engine used by the unit tests.
//!
//! Frame `f` loads atom `i` at `(f, i, 0)`, so tests can read the real frame
//! number straight out of the x coordinate. Superposition is a translation
//! mapping the first selected atom onto the first reference atom, and
//! ensemble alignment translates every structure's first atom onto their
//! mean, reporting fixed statistics (rmsd 0.5, 3 iterations).

use crate::engine::{Engine, EnsembleAlignment};
use nalgebra::{IsometryMatrix3, Point3, Vector3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MockError {
    #[error("no trajectory registered for {}", .0.display())]
    UnknownFile(PathBuf),
    #[error("no atoms match selection `{0}`")]
    BadSelection(String),
    #[error("seek past end of trajectory: frame {0}")]
    SeekPastEnd(usize),
}

#[derive(Debug, Clone)]
pub struct MockModel {
    pub names: Vec<String>,
    pub coords: Vec<Point3<f64>>,
}

impl MockModel {
    pub fn with_names(names: &[&str]) -> Self {
        MockModel {
            names: names.iter().map(|s| s.to_string()).collect(),
            coords: vec![Point3::origin(); names.len()],
        }
    }
}

pub struct MockReader {
    n_frames: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    files: HashMap<PathBuf, usize>,
}

impl MockEngine {
    pub fn new() -> Self {
        MockEngine::default()
    }

    /// Registers a trajectory of `n_frames` frames under `path`.
    pub fn with_file(mut self, path: &str, n_frames: usize) -> Self {
        self.files.insert(PathBuf::from(path), n_frames);
        self
    }
}

impl Engine for MockEngine {
    type Error = MockError;
    type Reader = MockReader;
    type Model = MockModel;
    type Selection = Vec<usize>;
    type Structure = Vec<Point3<f64>>;

    fn open(&self, path: &Path, _model: &MockModel) -> Result<MockReader, MockError> {
        self.files
            .get(path)
            .map(|&n_frames| MockReader { n_frames })
            .ok_or_else(|| MockError::UnknownFile(path.to_path_buf()))
    }

    fn frame_count(&self, reader: &MockReader) -> usize {
        reader.n_frames
    }

    fn load_frame(
        &self,
        reader: &mut MockReader,
        frame: usize,
        model: &mut MockModel,
    ) -> Result<(), MockError> {
        if frame >= reader.n_frames {
            return Err(MockError::SeekPastEnd(frame));
        }
        for (i, c) in model.coords.iter_mut().enumerate() {
            *c = Point3::new(frame as f64, i as f64, 0.0);
        }
        Ok(())
    }

    fn select(&self, model: &MockModel, selection: &str) -> Result<Vec<usize>, MockError> {
        // accept either a bare atom name or the `name == "X"` predicate form
        let wanted = selection
            .strip_prefix("name == ")
            .map(|s| s.trim_matches('"'))
            .unwrap_or(selection);
        let hits: Vec<usize> = model
            .names
            .iter()
            .enumerate()
            .filter(|(_, name)| name.as_str() == wanted)
            .map(|(i, _)| i)
            .collect();
        if hits.is_empty() {
            return Err(MockError::BadSelection(selection.to_string()));
        }
        Ok(hits)
    }

    fn select_all(&self, model: &MockModel) -> Vec<usize> {
        (0..model.coords.len()).collect()
    }

    fn extract(&self, model: &MockModel, subset: &Vec<usize>) -> Vec<Point3<f64>> {
        subset.iter().map(|&i| model.coords[i]).collect()
    }

    fn superpose(
        &self,
        model: &MockModel,
        subset: &Vec<usize>,
        reference: &Vec<Point3<f64>>,
    ) -> Result<IsometryMatrix3<f64>, MockError> {
        let a = model.coords[subset[0]];
        let b = reference[0];
        Ok(IsometryMatrix3::translation(b.x - a.x, b.y - a.y, b.z - a.z))
    }

    fn align_ensemble(
        &self,
        ensemble: &[Vec<Point3<f64>>],
    ) -> Result<EnsembleAlignment, MockError> {
        let mut mean = Vector3::zeros();
        for structure in ensemble {
            mean += structure[0].coords;
        }
        mean /= ensemble.len() as f64;

        let transforms = ensemble
            .iter()
            .map(|structure| {
                let first = structure[0];
                IsometryMatrix3::translation(mean.x - first.x, mean.y - first.y, mean.z - first.z)
            })
            .collect();

        Ok(EnsembleAlignment {
            transforms,
            rmsd: 0.5,
            iterations: 3,
        })
    }

    fn transform_model(
        &self,
        model: &mut MockModel,
        subset: &Vec<usize>,
        xform: &IsometryMatrix3<f64>,
    ) {
        for &i in subset {
            model.coords[i] = *xform * model.coords[i];
        }
    }

    fn transform_structure(&self, structure: &mut Vec<Point3<f64>>, xform: &IsometryMatrix3<f64>) {
        for c in structure.iter_mut() {
            *c = *xform * *c;
        }
    }
}
