//! Comparison sorts.

use super::{check_len, Algorithm, Trace};
use crate::error::Result;
use crate::store::LineRange;

use serde::{Deserialize, Serialize};

const MAX_VALUES: usize = 64;

fn demo_values() -> Vec<i64> {
    vec![38, 27, 43, 3, 9, 82, 10]
}

/// Insertion sort over a list of integers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertionSort {
    pub values: Vec<i64>,
}

impl Default for InsertionSort {
    fn default() -> Self {
        Self {
            values: demo_values(),
        }
    }
}

const INSERTION_SORT: &str = "\
for i in 1..n:
    key = a[i]
    j = i - 1
    while j >= 0 and a[j] > key:
        a[j + 1] = a[j]
        j = j - 1
    a[j + 1] = key";

impl Algorithm for InsertionSort {
    fn source(&self) -> &'static str {
        INSERTION_SORT
    }

    fn validate(&self) -> Result<()> {
        check_len("values", self.values.len(), 0, MAX_VALUES)
    }

    fn trace(&self) -> Trace {
        let mut a = self.values.clone();
        let mut t = Trace::new();

        for i in 1..a.len() {
            let key = a[i];
            t.span(LineRange::new(1, 2), format!("Pass {}: key = {}", i, key));
            let mut j = i;
            while j > 0 && a[j - 1] > key {
                t.at(4, format!("{} > {}", a[j - 1], key));
                a[j] = a[j - 1];
                t.span(
                    LineRange::new(5, 6),
                    format!("Shift {} right to index {}", a[j], j),
                );
                j -= 1;
            }
            a[j] = key;
            t.at(7, format!("Insert {} at index {}: {:?}", key, j, a));
        }

        t.note(format!("Sorted: {:?}", a));
        t
    }
}

/// Top-down merge sort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSort {
    pub values: Vec<i64>,
}

impl Default for MergeSort {
    fn default() -> Self {
        Self {
            values: demo_values(),
        }
    }
}

const MERGE_SORT: &str = "\
merge_sort(a, lo, hi):
    if hi - lo <= 1: return
    mid = (lo + hi) / 2
    merge_sort(a, lo, mid)
    merge_sort(a, mid, hi)
    merge(a, lo, mid, hi)";

fn merge_sort(a: &mut [i64], lo: usize, hi: usize, t: &mut Trace) {
    if hi - lo <= 1 {
        return;
    }
    let mid = (lo + hi) / 2;
    t.span(
        LineRange::new(3, 5),
        format!("Split {:?} into {:?} and {:?}", &a[lo..hi], &a[lo..mid], &a[mid..hi]),
    );
    merge_sort(a, lo, mid, t);
    merge_sort(a, mid, hi, t);

    let left = a[lo..mid].to_vec();
    let right = a[mid..hi].to_vec();
    let (mut i, mut j, mut k) = (0, 0, lo);
    while i < left.len() && j < right.len() {
        if left[i] <= right[j] {
            a[k] = left[i];
            i += 1;
        } else {
            a[k] = right[j];
            j += 1;
        }
        k += 1;
    }
    for &v in left[i..].iter().chain(&right[j..]) {
        a[k] = v;
        k += 1;
    }
    t.at(
        6,
        format!("Merge {:?} and {:?} into {:?}", left, right, &a[lo..hi]),
    );
}

impl Algorithm for MergeSort {
    fn source(&self) -> &'static str {
        MERGE_SORT
    }

    fn validate(&self) -> Result<()> {
        check_len("values", self.values.len(), 0, MAX_VALUES)
    }

    fn trace(&self) -> Trace {
        let mut a = self.values.clone();
        let mut t = Trace::new();
        let n = a.len();
        merge_sort(&mut a, 0, n, &mut t);
        t.note(format!("Sorted: {:?}", a));
        t
    }
}

/// Quicksort with Lomuto partitioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickSort {
    pub values: Vec<i64>,
}

impl Default for QuickSort {
    fn default() -> Self {
        Self {
            values: demo_values(),
        }
    }
}

const QUICK_SORT: &str = "\
quick_sort(a, lo, hi):
    if lo >= hi: return
    pivot = a[hi]
    i = lo
    for j in lo..hi:
        if a[j] < pivot:
            swap(a[i], a[j]); i = i + 1
    swap(a[i], a[hi])
    quick_sort(a, lo, i - 1)
    quick_sort(a, i + 1, hi)";

fn quick_sort(a: &mut [i64], lo: usize, hi: usize, t: &mut Trace) {
    if lo >= hi {
        return;
    }
    let pivot = a[hi];
    t.span(
        LineRange::new(3, 4),
        format!("Partition {:?} around pivot {}", &a[lo..=hi], pivot),
    );
    let mut i = lo;
    for j in lo..hi {
        if a[j] < pivot {
            a.swap(i, j);
            t.span(
                LineRange::new(6, 7),
                format!("{} < {}: swap indices {} and {}", a[i], pivot, i, j),
            );
            i += 1;
        }
    }
    a.swap(i, hi);
    t.at(8, format!("Place pivot {} at index {}: {:?}", pivot, i, a));

    if i > lo {
        quick_sort(a, lo, i - 1, t);
    }
    quick_sort(a, i + 1, hi, t);
}

impl Algorithm for QuickSort {
    fn source(&self) -> &'static str {
        QUICK_SORT
    }

    fn validate(&self) -> Result<()> {
        check_len("values", self.values.len(), 0, MAX_VALUES)
    }

    fn trace(&self) -> Trace {
        let mut a = self.values.clone();
        let mut t = Trace::new();
        if !a.is_empty() {
            let hi = a.len() - 1;
            quick_sort(&mut a, 0, hi, &mut t);
        }
        t.note(format!("Sorted: {:?}", a));
        t
    }
}

/// In-place heap sort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapSort {
    pub values: Vec<i64>,
}

impl Default for HeapSort {
    fn default() -> Self {
        Self {
            values: demo_values(),
        }
    }
}

const HEAP_SORT: &str = "\
build_max_heap(a)
for end in n-1 down to 1:
    swap(a[0], a[end])
    sift_down(a, 0, end)
sift_down(a, i, n):
    largest = max of i, 2i+1, 2i+2 below n
    if largest != i: swap(a[i], a[largest]); sift_down(a, largest, n)";

fn sift_down(a: &mut [i64], mut i: usize, n: usize, t: &mut Trace) {
    loop {
        let mut largest = i;
        for child in [2 * i + 1, 2 * i + 2] {
            if child < n && a[child] > a[largest] {
                largest = child;
            }
        }
        if largest == i {
            return;
        }
        a.swap(i, largest);
        t.span(
            LineRange::new(6, 7),
            format!("Sift {} down from index {} to {}", a[largest], i, largest),
        );
        i = largest;
    }
}

impl Algorithm for HeapSort {
    fn source(&self) -> &'static str {
        HEAP_SORT
    }

    fn validate(&self) -> Result<()> {
        check_len("values", self.values.len(), 0, MAX_VALUES)
    }

    fn trace(&self) -> Trace {
        let mut a = self.values.clone();
        let mut t = Trace::new();
        let n = a.len();

        for i in (0..n / 2).rev() {
            sift_down(&mut a, i, n, &mut t);
        }
        t.at(1, format!("Max heap built: {:?}", a));

        for end in (1..n).rev() {
            a.swap(0, end);
            t.span(
                LineRange::new(2, 3),
                format!("Move max {} to index {}", a[end], end),
            );
            sift_down(&mut a, 0, end, &mut t);
        }

        t.note(format!("Sorted: {:?}", a));
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_message(values: &[i64]) -> String {
        let mut sorted = values.to_vec();
        sorted.sort();
        format!("Sorted: {:?}", sorted)
    }

    fn inputs() -> Vec<Vec<i64>> {
        vec![
            demo_values(),
            vec![],
            vec![1],
            vec![2, 1],
            vec![5, 5, 5],
            vec![9, 8, 7, 6, 5, 4, 3, 2, 1],
            vec![-3, 10, 0, -7, 4, 4, 1],
        ]
    }

    #[test]
    fn test_insertion_sort() {
        for values in inputs() {
            let trace = InsertionSort {
                values: values.clone(),
            }
            .trace();
            assert_eq!(trace.last_message().unwrap(), sorted_message(&values));
        }
    }

    #[test]
    fn test_merge_sort() {
        for values in inputs() {
            let trace = MergeSort {
                values: values.clone(),
            }
            .trace();
            assert_eq!(trace.last_message().unwrap(), sorted_message(&values));
        }
    }

    #[test]
    fn test_quick_sort() {
        for values in inputs() {
            let trace = QuickSort {
                values: values.clone(),
            }
            .trace();
            assert_eq!(trace.last_message().unwrap(), sorted_message(&values));
        }
    }

    #[test]
    fn test_heap_sort() {
        for values in inputs() {
            let trace = HeapSort {
                values: values.clone(),
            }
            .trace();
            assert_eq!(trace.last_message().unwrap(), sorted_message(&values));
        }
    }

    #[test]
    fn test_insertion_sort_steps() {
        let trace = InsertionSort {
            values: vec![2, 1],
        }
        .trace();
        let messages: Vec<_> = trace.messages().collect();
        assert_eq!(
            messages,
            vec![
                "Pass 1: key = 1",
                "2 > 1",
                "Shift 2 right to index 1",
                "Insert 1 at index 0: [1, 2]",
                "Sorted: [1, 2]",
            ]
        );
    }

    #[test]
    fn test_too_many_values() {
        let sort = QuickSort {
            values: vec![0; MAX_VALUES + 1],
        };
        assert!(sort.validate().is_err());
    }
}
