//! Minimum run-length filtering of boolean masks.

/// Surviving runs of a mask after [`is_min_length`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Runs {
    /// Input mask with every run shorter than the minimum cleared.
    pub mask: Vec<bool>,
    /// First index of each surviving run.
    pub starts: Vec<usize>,
    /// Last index (inclusive) of each surviving run.
    pub ends: Vec<usize>,
}

impl Runs {
    /// Number of surviving runs.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// True when no run survived.
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// `(start, end)` pairs, inclusive.
    pub fn spans(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.starts.iter().copied().zip(self.ends.iter().copied())
    }
}

/// Keep only the runs of consecutive `true` values at least `min_run_length` long.
///
/// Runs touching either end of the mask count like any other run. A minimum of
/// 0 or 1 keeps the mask unchanged.
pub fn is_min_length(mask: &[bool], min_run_length: usize) -> Runs {
    let min_len = min_run_length.max(1);
    let mut out = vec![false; mask.len()];
    let mut starts = Vec::new();
    let mut ends = Vec::new();

    let mut i = 0;
    while i < mask.len() {
        if !mask[i] {
            i += 1;
            continue;
        }
        let start = i;
        while i < mask.len() && mask[i] {
            i += 1;
        }
        let end = i - 1;
        if end - start + 1 >= min_len {
            out[start..=end].fill(true);
            starts.push(start);
            ends.push(end);
        }
    }

    Runs { mask: out, starts, ends }
}
