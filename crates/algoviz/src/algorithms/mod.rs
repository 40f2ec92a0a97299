//! The algorithm gallery.
//!
//! Every algorithm is a plain struct holding its input and implementing
//! [`Algorithm`]. [`Algorithm::trace`] is a pure function of that input: it runs
//! the algorithm and records each step as a [`Step`] (highlighted pseudo-code
//! lines plus a human-readable message). The session replays the trace through
//! the run controller, which is where pacing, pausing and cancellation happen.
//!
//! The [`Registry`] maps gallery identifiers to metadata and builds algorithm
//! instances from optional JSON input.
//!
//! # Examples
//!
//! ```
//! use algoviz::algorithms::Registry;
//!
//! let registry = Registry::new();
//! let sort = registry
//!     .build("insertionSort", Some(serde_json::json!({ "values": [3, 1, 2] })))
//!     .unwrap();
//!
//! let trace = sort.trace();
//! assert_eq!(trace.last_message(), Some("Sorted: [1, 2, 3]"));
//! ```

use crate::error::{Error, Result};
use crate::store::LineRange;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod geometry;
pub mod graph;
pub mod recursion;
pub mod sorting;
pub mod strings;
pub mod trees;

/// One unit of algorithm progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Pseudo-code lines to highlight while this step is shown.
    pub line: LineRange,
    /// Trace message appended to the console log.
    pub message: String,
}

/// The ordered steps of one algorithm execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    steps: Vec<Step>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a step highlighting `line`.
    pub fn at(&mut self, line: i64, message: impl Into<String>) {
        self.span(LineRange::line(line), message);
    }

    /// Records a step highlighting a range of lines.
    pub fn span(&mut self, line: LineRange, message: impl Into<String>) {
        self.steps.push(Step {
            line,
            message: message.into(),
        });
    }

    /// Records a step with nothing highlighted.
    pub fn note(&mut self, message: impl Into<String>) {
        self.span(LineRange::NONE, message);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Message of the final step, usually the result summary.
    pub fn last_message(&self) -> Option<&str> {
        self.steps.last().map(|step| step.message.as_str())
    }

    /// All messages, in order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|step| step.message.as_str())
    }
}

impl IntoIterator for Trace {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

/// A steppable algorithm.
pub trait Algorithm: Send + Sync + fmt::Debug {
    /// Pseudo-code shown next to the visualization. Line numbers in the
    /// trace refer to this text, 1-based.
    fn source(&self) -> &'static str;

    /// Runs the algorithm on its input and records every step.
    fn trace(&self) -> Trace;

    /// Rejects inputs the algorithm cannot run on.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Gallery section an algorithm is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sorting,
    Trees,
    Graphs,
    Strings,
    Geometry,
    Recursion,
    DynamicProgramming,
    Greedy,
}

/// Gallery metadata for one algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmInfo {
    /// Stable identifier, as used by the UI (`"quickSort"`).
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    pub category: Category,
}

type Builder = fn(Option<serde_json::Value>) -> Result<Arc<dyn Algorithm>>;

struct Entry {
    info: AlgorithmInfo,
    build: Builder,
}

/// Deserializes `input` into `A`, falling back to `A::default()`.
fn build<A>(input: Option<serde_json::Value>) -> Result<Arc<dyn Algorithm>>
where
    A: Algorithm + DeserializeOwned + Default + 'static,
{
    let algorithm = match input {
        None | Some(serde_json::Value::Null) => A::default(),
        Some(value) => {
            serde_json::from_value::<A>(value).map_err(|e| Error::InvalidInput(e.to_string()))?
        }
    };
    algorithm.validate()?;
    Ok(Arc::new(algorithm))
}

/// Fails with [`Error::InvalidInput`] unless `min <= len <= max`.
pub(crate) fn check_len(what: &str, len: usize, min: usize, max: usize) -> Result<()> {
    if len < min || len > max {
        return Err(Error::InvalidInput(format!(
            "{} must have between {} and {} elements, got {}",
            what, min, max, len
        )));
    }
    Ok(())
}

/// Largest absolute weight, coordinate or cell value accepted as input.
///
/// Keeps sums of path weights and cross products of coordinate differences
/// inside `i64`.
pub const MAX_MAGNITUDE: i64 = 1_000_000_000;

/// Fails with [`Error::InvalidInput`] unless `|value| <= MAX_MAGNITUDE`.
pub(crate) fn check_magnitude(what: &str, value: i64) -> Result<()> {
    if !(-MAX_MAGNITUDE..=MAX_MAGNITUDE).contains(&value) {
        return Err(Error::InvalidInput(format!(
            "{} must be between {} and {}, got {}",
            what, -MAX_MAGNITUDE, MAX_MAGNITUDE, value
        )));
    }
    Ok(())
}

/// Maps algorithm identifiers to metadata and constructors.
pub struct Registry {
    entries: Vec<Entry>,
}

macro_rules! entry {
    ($id:literal, $name:literal, $category:ident, $ty:ty) => {
        Entry {
            info: AlgorithmInfo {
                id: $id,
                name: $name,
                category: Category::$category,
            },
            build: build::<$ty>,
        }
    };
}

impl Registry {
    /// The built-in gallery.
    pub fn new() -> Self {
        let entries = vec![
            entry!("insertionSort", "Insertion Sort", Sorting, sorting::InsertionSort),
            entry!("mergeSort", "Merge Sort", Sorting, sorting::MergeSort),
            entry!("quickSort", "Quick Sort", Sorting, sorting::QuickSort),
            entry!("heapSort", "Heap Sort", Sorting, sorting::HeapSort),
            entry!("binaryHeap", "Binary Heap", Trees, trees::BinaryHeap),
            entry!("binaryTree", "Binary Search Tree", Trees, trees::BinaryTree),
            entry!("avlTree", "AVL Tree", Trees, trees::AvlTree),
            entry!("bTree", "B-Tree", Trees, trees::BTree),
            entry!("redBlackTree", "Red-Black Tree", Trees, trees::RedBlackTree),
            entry!(
                "dijkstraShortestPath",
                "Dijkstra Shortest Path",
                Graphs,
                graph::Dijkstra
            ),
            entry!(
                "bellmanFordShortestPath",
                "Bellman-Ford Shortest Path",
                Graphs,
                graph::BellmanFord
            ),
            entry!(
                "kruskalMinimumSpanningTree",
                "Kruskal Minimum Spanning Tree",
                Graphs,
                graph::Kruskal
            ),
            entry!(
                "primMinimumSpanningTree",
                "Prim Minimum Spanning Tree",
                Graphs,
                graph::Prim
            ),
            entry!("knuthMorrisPratt", "Knuth-Morris-Pratt", Strings, strings::KnuthMorrisPratt),
            entry!("rabinKarp", "Rabin-Karp", Strings, strings::RabinKarp),
            entry!("grahamScan", "Graham Scan", Geometry, geometry::GrahamScan),
            entry!("jarvisMarch", "Jarvis March", Geometry, geometry::JarvisMarch),
            entry!("convexHull", "Convex Hull (Monotone Chain)", Geometry, geometry::ConvexHull),
            entry!("hilbertCurves", "Hilbert Curves", Geometry, geometry::HilbertCurve),
            entry!(
                "factorialCalculator",
                "Factorial Calculator",
                Recursion,
                recursion::Factorial
            ),
            entry!("towersOfHanoi", "Towers of Hanoi", Recursion, recursion::TowersOfHanoi),
            entry!("coinChange", "Coin Change", DynamicProgramming, recursion::CoinChange),
            entry!("maxSumPath", "Max Sum Path", DynamicProgramming, recursion::MaxSumPath),
            entry!(
                "fractionalKnapsack",
                "Fractional Knapsack",
                Greedy,
                recursion::FractionalKnapsack
            ),
            entry!(
                "fractionalKnapsackRep",
                "Knapsack with Repetition",
                DynamicProgramming,
                recursion::UnboundedKnapsack
            ),
            entry!(
                "travelingProblem",
                "Traveling Salesman",
                Graphs,
                recursion::TravelingSalesman
            ),
        ];
        Self { entries }
    }

    /// Metadata of every algorithm, in gallery order.
    pub fn list(&self) -> Vec<AlgorithmInfo> {
        self.entries.iter().map(|entry| entry.info.clone()).collect()
    }

    pub fn info(&self, id: &str) -> Option<&AlgorithmInfo> {
        self.entry(id).map(|entry| &entry.info)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entry(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds `id` with the given JSON input, or its demo input when `None`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownAlgorithm`] for an unregistered id,
    /// [`Error::InvalidInput`] when the input does not deserialize or validate.
    pub fn build(&self, id: &str, input: Option<serde_json::Value>) -> Result<Arc<dyn Algorithm>> {
        let entry = self
            .entry(id)
            .ok_or_else(|| Error::UnknownAlgorithm(id.to_string()))?;
        (entry.build)(input)
    }

    fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.info.id == id)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("algorithms", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_ids_are_unique() {
        let registry = Registry::new();
        let ids: HashSet<_> = registry.list().iter().map(|info| info.id).collect();
        assert_eq!(ids.len(), registry.len());
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_every_demo_builds_and_traces() {
        let registry = Registry::new();
        for info in registry.list() {
            let algorithm = registry.build(info.id, None).unwrap();
            let trace = algorithm.trace();
            assert!(!trace.is_empty(), "{} produced no steps", info.id);
            assert!(!algorithm.source().is_empty(), "{} has no source", info.id);

            let lines = algorithm.source().lines().count() as i64;
            for step in trace.steps() {
                assert!(
                    step.line.is_none() || (step.line.start >= 1 && step.line.end <= lines),
                    "{} highlights {:?} outside its {} source lines",
                    info.id,
                    step.line,
                    lines
                );
            }
        }
    }

    #[test]
    fn test_unknown_algorithm() {
        let registry = Registry::new();
        let err = registry.build("bogoSort", None).unwrap_err();
        assert!(matches!(err, Error::UnknownAlgorithm(id) if id == "bogoSort"));
        assert!(registry.info("bogoSort").is_none());
        assert!(!registry.contains("bogoSort"));
    }

    #[test]
    fn test_null_input_uses_demo() {
        let registry = Registry::new();
        let demo = registry.build("quickSort", None).unwrap().trace();
        let null = registry
            .build("quickSort", Some(serde_json::Value::Null))
            .unwrap()
            .trace();
        assert_eq!(demo, null);
    }

    #[test]
    fn test_bad_input_is_rejected() {
        let registry = Registry::new();
        let err = registry
            .build("quickSort", Some(serde_json::json!({ "values": "nope" })))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_balanced_trees_are_listed() {
        let registry = Registry::new();
        assert_eq!(registry.len(), 26);
        for id in ["avlTree", "bTree", "redBlackTree"] {
            assert_eq!(registry.info(id).unwrap().category, Category::Trees);
        }
        assert_eq!(
            registry.info("fractionalKnapsackRep").unwrap().category,
            Category::DynamicProgramming
        );
    }

    #[test]
    fn test_info_lookup() {
        let registry = Registry::new();
        let info = registry.info("dijkstraShortestPath").unwrap();
        assert_eq!(info.name, "Dijkstra Shortest Path");
        assert_eq!(info.category, Category::Graphs);
    }

    #[test]
    fn test_trace_helpers() {
        let mut trace = Trace::new();
        trace.at(1, "first");
        trace.span(LineRange::new(2, 3), "second");
        trace.note("done");

        assert_eq!(trace.len(), 3);
        assert_eq!(trace.last_message(), Some("done"));
        assert_eq!(trace.messages().collect::<Vec<_>>(), vec!["first", "second", "done"]);
        assert_eq!(trace.steps()[1].line, LineRange::new(2, 3));
        assert!(trace.into_iter().last().unwrap().line.is_none());
    }

    #[test]
    fn test_check_len() {
        assert!(check_len("values", 3, 1, 5).is_ok());
        assert!(check_len("values", 0, 1, 5).is_err());
        assert!(check_len("values", 6, 1, 5).is_err());
    }

    #[test]
    fn test_check_magnitude() {
        assert!(check_magnitude("weight", MAX_MAGNITUDE).is_ok());
        assert!(check_magnitude("weight", -MAX_MAGNITUDE).is_ok());
        assert!(check_magnitude("weight", MAX_MAGNITUDE + 1).is_err());
        assert!(check_magnitude("weight", i64::MIN).is_err());
    }

    #[test]
    fn test_oversized_numbers_are_rejected_before_tracing() {
        let registry = Registry::new();
        let cases = [
            (
                "dijkstraShortestPath",
                serde_json::json!({
                    "graph": {
                        "nodes": ["P", "Q", "R"],
                        "edges": [
                            { "from": 0, "to": 1, "weight": i64::MAX },
                            { "from": 1, "to": 2, "weight": i64::MAX }
                        ]
                    }
                }),
            ),
            (
                "kruskalMinimumSpanningTree",
                serde_json::json!({
                    "graph": {
                        "nodes": ["P", "Q"],
                        "edges": [{ "from": 0, "to": 1, "weight": i64::MIN }]
                    }
                }),
            ),
            (
                "grahamScan",
                serde_json::json!({
                    "points": [
                        { "x": i64::MAX - 1, "y": 0 },
                        { "x": i64::MIN + 1, "y": 1 },
                        { "x": 0, "y": i64::MAX - 1 }
                    ]
                }),
            ),
            (
                "maxSumPath",
                serde_json::json!({ "grid": [[i64::MAX, i64::MAX]] }),
            ),
        ];
        for (id, input) in cases {
            let err = registry.build(id, Some(input)).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{} accepted {:?}", id, err);
        }
    }
}
