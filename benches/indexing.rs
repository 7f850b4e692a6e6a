use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::{IsometryMatrix3, Point3};
use std::hint::black_box;
use std::path::Path;
use std::time::Duration;
use vtraj::engine::{Engine, EnsembleAlignment};
use vtraj::sampling::Sampling;
use vtraj::trajectory::Trajectory;
use vtraj::virtual_trajectory::VirtualTrajectory;

/// A zero-I/O engine so the benchmarks measure the index bookkeeping, not a
/// toolkit.
#[derive(Clone, Copy)]
struct SyntheticEngine {
    n_frames: usize,
}

struct SyntheticReader {
    n_frames: usize,
}

impl Engine for SyntheticEngine {
    type Error = std::convert::Infallible;
    type Reader = SyntheticReader;
    type Model = Vec<Point3<f64>>;
    type Selection = Vec<usize>;
    type Structure = Vec<Point3<f64>>;

    fn open(&self, _path: &Path, _model: &Self::Model) -> Result<SyntheticReader, Self::Error> {
        Ok(SyntheticReader {
            n_frames: self.n_frames,
        })
    }

    fn frame_count(&self, reader: &SyntheticReader) -> usize {
        reader.n_frames
    }

    fn load_frame(
        &self,
        _reader: &mut SyntheticReader,
        frame: usize,
        model: &mut Self::Model,
    ) -> Result<(), Self::Error> {
        for c in model.iter_mut() {
            c.x = frame as f64;
        }
        Ok(())
    }

    fn select(&self, model: &Self::Model, _selection: &str) -> Result<Vec<usize>, Self::Error> {
        Ok((0..model.len()).collect())
    }

    fn select_all(&self, model: &Self::Model) -> Vec<usize> {
        (0..model.len()).collect()
    }

    fn extract(&self, model: &Self::Model, subset: &Vec<usize>) -> Vec<Point3<f64>> {
        subset.iter().map(|&i| model[i]).collect()
    }

    fn superpose(
        &self,
        _model: &Self::Model,
        _subset: &Vec<usize>,
        _reference: &Vec<Point3<f64>>,
    ) -> Result<IsometryMatrix3<f64>, Self::Error> {
        Ok(IsometryMatrix3::identity())
    }

    fn align_ensemble(
        &self,
        ensemble: &[Vec<Point3<f64>>],
    ) -> Result<EnsembleAlignment, Self::Error> {
        Ok(EnsembleAlignment {
            transforms: vec![IsometryMatrix3::identity(); ensemble.len()],
            rmsd: 0.0,
            iterations: 1,
        })
    }

    fn transform_model(
        &self,
        model: &mut Self::Model,
        subset: &Vec<usize>,
        xform: &IsometryMatrix3<f64>,
    ) {
        for &i in subset {
            model[i] = *xform * model[i];
        }
    }

    fn transform_structure(&self, structure: &mut Vec<Point3<f64>>, xform: &IsometryMatrix3<f64>) {
        for c in structure.iter_mut() {
            *c = *xform * *c;
        }
    }
}

fn composite(children: usize, frames: usize) -> VirtualTrajectory<SyntheticEngine> {
    let engine = SyntheticEngine { n_frames: frames };
    let trajectories = (0..children)
        .map(|i| {
            let model = vec![Point3::origin(); 16];
            Trajectory::open_with(
                engine,
                format!("synthetic-{i}.dcd"),
                model,
                &Sampling::stride(0, 3),
            )
            .unwrap()
        })
        .collect();
    VirtualTrajectory::new(trajectories)
}

fn rebuild_and_locate(children: usize, frames: usize) -> usize {
    let mut vt = composite(children, frames);
    let len = vt.len().unwrap();
    let mut sum = 0;
    for i in 0..len {
        sum += vt.frame_location(i as isize).unwrap().real_frame;
    }
    black_box(sum)
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_index");
    group.measurement_time(Duration::from_secs(6));
    group.bench_function("rebuild and locate 8x10k", |b| {
        b.iter(|| rebuild_and_locate(8, 10_000))
    });
    group.bench_function("rebuild and locate 64x1k", |b| {
        b.iter(|| rebuild_and_locate(64, 1_000))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
