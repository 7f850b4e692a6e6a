/// Frame subsampling policy for a trajectory.
///
/// `Stride` picks every `stride`-th frame starting at `skip`. An `Explicit`
/// list of frame positions completely overrides skip/stride and is used
/// verbatim, in the supplied order, without any monotonicity assumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sampling {
    Stride { skip: usize, stride: usize },
    Explicit(Vec<usize>),
}

impl Default for Sampling {
    /// Every frame, from the start.
    fn default() -> Self {
        Sampling::Stride { skip: 0, stride: 1 }
    }
}

impl Sampling {
    /// Skip the first `skip` frames, then take every `stride`-th frame.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is zero.
    pub fn stride(skip: usize, stride: usize) -> Self {
        assert!(stride > 0, "stride must be at least 1");
        Sampling::Stride { skip, stride }
    }

    /// Use exactly these positions, in this order. The entries are not
    /// validated here; an out-of-range position fails when dereferenced.
    pub fn explicit(positions: Vec<usize>) -> Self {
        Sampling::Explicit(positions)
    }

    /// The ordered positions selected out of a sequence of length `n`.
    ///
    /// For `Stride`, the result has length `ceil((n - skip) / stride)` (zero
    /// when `skip >= n`) and element `k` equals `skip + k * stride`.
    pub fn indices(&self, n: usize) -> Vec<usize> {
        match self {
            Sampling::Stride { skip, stride } => (*skip..n).step_by(*stride).collect(),
            Sampling::Explicit(positions) => positions.clone(),
        }
    }
}
