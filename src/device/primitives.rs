//! Data-parallel primitives
//!
//! Prefix sum, reduction, segmented reduce, segmented sort, gather and indptr
//! expansion. Each primitive is expressed over flat slices with segment
//! semantics given by an offsets array (`offsets[r]..offsets[r + 1]` is
//! segment `r`) or by a per-element segment id, and runs on the rayon pool the
//! caller is installed in.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::ops::Add;

/// Smallest chunk handled by one worker in the scan passes
const SCAN_MIN_CHUNK: usize = 4096;

/// Exclusive prefix sum: `output[0] = 0`, `output[i + 1] = output[i] + input[i]`
///
/// `output` must have length `input.len() + 1`. Returns the total.
///
/// Two-pass chunked scan: per-chunk totals, a short scan over chunk totals,
/// then an independent local scan per chunk.
///
/// # Panics
///
/// Panics if `output.len() != input.len() + 1`
pub fn exclusive_sum<T>(input: &[T], output: &mut [T]) -> T
where
    T: Copy + Default + Send + Sync + Add<Output = T>,
{
    assert_eq!(output.len(), input.len() + 1, "exclusive_sum: bad output length");

    let chunk = (input.len() / (rayon::current_num_threads() * 4)).max(SCAN_MIN_CHUNK);

    let chunk_totals: Vec<T> = input
        .par_chunks(chunk)
        .map(|c| c.iter().fold(T::default(), |acc, &x| acc + x))
        .collect();

    let mut chunk_bases = Vec::with_capacity(chunk_totals.len());
    let mut running = T::default();
    for &total in &chunk_totals {
        chunk_bases.push(running);
        running = running + total;
    }

    output[0] = T::default();
    output[1..]
        .par_chunks_mut(chunk)
        .zip(input.par_chunks(chunk))
        .zip(chunk_bases.par_iter())
        .for_each(|((out, inp), &base)| {
            let mut acc = base;
            for (o, &x) in out.iter_mut().zip(inp) {
                acc = acc + x;
                *o = acc;
            }
        });

    running
}

/// Maximum element (`0` for empty input)
#[must_use]
pub fn reduce_max(input: &[u64]) -> u64 {
    input.par_iter().copied().max().unwrap_or(0)
}

/// Adjacent differences of an offsets array: `output[r] = offsets[r + 1] - offsets[r]`
///
/// # Panics
///
/// Panics if `output.len() + 1 != offsets.len()`
pub fn adjacent_difference(offsets: &[u64], output: &mut [u64]) {
    assert_eq!(output.len() + 1, offsets.len(), "adjacent_difference: bad output length");
    output
        .par_iter_mut()
        .zip(offsets.par_windows(2))
        .for_each(|(o, w)| *o = w[1] - w[0]);
}

/// Segmented count: `output[r]` = number of elements in segment `r` matching `pred`
///
/// # Panics
///
/// Panics if `output.len() + 1 != offsets.len()`
#[allow(clippy::cast_possible_truncation)]
pub fn segmented_count<T, P>(values: &[T], offsets: &[u64], output: &mut [u64], pred: P)
where
    T: Sync,
    P: Fn(&T) -> bool + Sync,
{
    assert_eq!(output.len() + 1, offsets.len(), "segmented_count: bad output length");
    output.par_iter_mut().enumerate().for_each(|(r, o)| {
        let segment = &values[offsets[r] as usize..offsets[r + 1] as usize];
        *o = segment.iter().filter(|x| pred(x)).count() as u64;
    });
}

/// Expand an offsets array into per-element owning segment ids
///
/// `output[i]` is the unique `r` with `offsets[r] <= i < offsets[r + 1]`;
/// empty segments own nothing. `output` must have length `offsets[last]`.
///
/// # Panics
///
/// Panics if `offsets` is empty
pub fn expand_indptr(offsets: &[u64], output: &mut [usize]) {
    assert!(!offsets.is_empty(), "expand_indptr: offsets must be non-empty");
    output.par_iter_mut().enumerate().for_each(|(i, row)| {
        // Last segment whose start is <= i; skips empty segments sharing that start
        *row = offsets.partition_point(|&start| start <= i as u64) - 1;
    });
}

/// Gather: `output[j] = source[index[j]]`
#[allow(clippy::cast_possible_truncation)]
pub fn gather<T: Copy + Send + Sync>(source: &[T], index: &[u64], output: &mut [T]) {
    output
        .par_iter_mut()
        .zip(index.par_iter())
        .for_each(|(o, &i)| *o = source[i as usize]);
}

/// Fill with node ids `0, 1, 2, ...`
///
/// Callers guarantee `output.len() <= u32::MAX as usize + 1`
/// (`CscView::validate_shape` rejects larger graphs).
#[allow(clippy::cast_possible_truncation)]
pub fn sequence(output: &mut [u32]) {
    debug_assert!(output.len() as u64 <= u64::from(u32::MAX) + 1);
    output
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, o)| *o = i as u32);
}

/// Segmented sort of key/value pairs
///
/// Sorts each segment (given by the non-decreasing per-element `segments`
/// ids) ascending by `cmp` on keys, ties broken by value. Implemented as one
/// global parallel sort keyed on `(segment, key, value)`; `scratch` must have
/// the same length as `keys`.
///
/// # Panics
///
/// Panics if the slice lengths differ
pub fn segmented_sort_pairs<K, V, F>(
    segments: &[usize],
    keys: &mut [K],
    values: &mut [V],
    scratch: &mut [(usize, K, V)],
    cmp: F,
) where
    K: Copy + Send + Sync,
    V: Copy + Ord + Send + Sync,
    F: Fn(&K, &K) -> Ordering + Sync,
{
    assert_eq!(segments.len(), keys.len(), "segmented_sort_pairs: keys length");
    assert_eq!(keys.len(), values.len(), "segmented_sort_pairs: values length");
    assert_eq!(keys.len(), scratch.len(), "segmented_sort_pairs: scratch length");

    scratch
        .par_iter_mut()
        .zip(segments.par_iter().zip(keys.par_iter().zip(values.par_iter())))
        .for_each(|(t, (&s, (&k, &v)))| *t = (s, k, v));

    scratch.par_sort_unstable_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| cmp(&a.1, &b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    keys.par_iter_mut()
        .zip(values.par_iter_mut())
        .zip(scratch.par_iter())
        .for_each(|((k, v), t)| {
            *k = t.1;
            *v = t.2;
        });
}

/// Segmented sort of keys only (ascending within each segment)
///
/// # Panics
///
/// Panics if the slice lengths differ
pub fn segmented_sort<K>(segments: &[usize], keys: &mut [K], scratch: &mut [(usize, K)])
where
    K: Copy + Ord + Send + Sync,
{
    assert_eq!(segments.len(), keys.len(), "segmented_sort: keys length");
    assert_eq!(keys.len(), scratch.len(), "segmented_sort: scratch length");

    scratch
        .par_iter_mut()
        .zip(segments.par_iter().zip(keys.par_iter()))
        .for_each(|(t, (&s, &k))| *t = (s, k));

    scratch.par_sort_unstable();

    keys.par_iter_mut()
        .zip(scratch.par_iter())
        .for_each(|(k, t)| *k = t.1);
}
