//! Sliding-window segmentation over an ordered line sequence.
//!
//! Windows group `window_size` consecutive lines, advancing by
//! `window_size - overlap` each step. The trailing window is always emitted
//! even when it is shorter than `window_size`, so every line appears in at
//! least one window.

use crate::model::Line;

/// Slice `lines` into overlapping windows of up to `window_size` lines.
///
/// `lines` must already be in reading order. The caller guarantees
/// `window_size >= 1` and `overlap < window_size`; both are validated at
/// exporter construction.
///
/// Iteration stops after the window whose start index `i` satisfies
/// `i + window_size >= lines.len()` — that boundary window is the last one
/// emitted, partial or not. An empty input yields no windows.
pub fn sliding_windows<'a>(
    lines: &'a [Line],
    window_size: usize,
    overlap: usize,
) -> Vec<&'a [Line]> {
    debug_assert!(window_size >= 1);
    debug_assert!(overlap < window_size);

    if lines.is_empty() {
        return Vec::new();
    }

    let step = window_size - overlap;
    let mut windows = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + window_size).min(lines.len());
        windows.push(&lines[start..end]);

        if start + window_size >= lines.len() {
            break;
        }
        start += step;
    }

    windows
}
