//! Sliding windows over a series
//!
//! Window `i` covers rows `i..i + seq_len`; its target is row `i + seq_len`.
//! The number of windows is `n_rows - seq_len - 1`; the last complete
//! window is left out.

use ndarray::{Array2, ArrayView1, ArrayView2, s};

/// Number of windows replayed over `n_rows` rows
pub fn window_count(n_rows: usize, seq_len: usize) -> usize {
    n_rows.saturating_sub(seq_len + 1)
}

/// Iterator of `(window, target_row)` pairs
pub struct SlidingWindows<'a> {
    data: &'a Array2<f64>,
    seq_len: usize,
    position: usize,
    count: usize,
}

impl<'a> SlidingWindows<'a> {
    pub fn new(data: &'a Array2<f64>, seq_len: usize) -> Self {
        Self {
            data,
            seq_len,
            position: 0,
            count: window_count(data.nrows(), seq_len),
        }
    }
}

impl<'a> Iterator for SlidingWindows<'a> {
    type Item = (ArrayView2<'a, f64>, ArrayView1<'a, f64>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.count {
            return None;
        }

        let i = self.position;
        self.position += 1;

        let data: &'a Array2<f64> = self.data;
        let window = data.slice(s![i..i + self.seq_len, ..]);
        let target = data.row(i + self.seq_len);
        Some((window, target))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.position;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for SlidingWindows<'a> {}
