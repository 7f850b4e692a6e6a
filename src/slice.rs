/// A `start:stop:step` slice over a frame sequence, with the usual
/// scripting-language semantics: omitted bounds default to the relevant end,
/// negative bounds count from the end, out-of-range bounds are clamped, and a
/// negative step walks the sequence backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl Slice {
    pub fn new(
        start: impl Into<Option<isize>>,
        stop: impl Into<Option<isize>>,
        step: impl Into<Option<isize>>,
    ) -> Self {
        Slice {
            start: start.into(),
            stop: stop.into(),
            step: step.into(),
        }
    }

    /// The positions this slice enumerates over a sequence of length `len`.
    ///
    /// # Panics
    ///
    /// Panics if the step is zero.
    pub fn indices(&self, len: usize) -> Vec<usize> {
        let len = len as isize;
        let step = self.step.unwrap_or(1);
        assert!(step != 0, "slice step cannot be zero");

        // clamping bounds differ by direction: a reverse slice may stand on
        // len - 1 and must be able to stop just before position 0
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

        let clamp = |bound: Option<isize>, default: isize| -> isize {
            match bound {
                None => default,
                Some(mut b) => {
                    if b < 0 {
                        b += len;
                        if b < lower {
                            b = lower;
                        }
                    } else if b > upper {
                        b = upper;
                    }
                    b
                }
            }
        };

        let start = clamp(self.start, if step < 0 { upper } else { lower });
        let stop = clamp(self.stop, if step < 0 { lower } else { upper });

        let mut positions = Vec::new();
        let mut i = start;
        if step > 0 {
            while i < stop {
                positions.push(i as usize);
                i += step;
            }
        } else {
            while i > stop {
                positions.push(i as usize);
                i += step;
            }
        }
        positions
    }
}
