//! Recursion, dynamic programming and greedy classics.

use super::{check_len, check_magnitude, Algorithm, Trace};
use crate::error::{Error, Result};
use crate::store::LineRange;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

fn out_of_range(what: &str, value: impl std::fmt::Display, min: u64, max: u64) -> Error {
    Error::InvalidInput(format!(
        "{} must be between {} and {}, got {}",
        what, min, max, value
    ))
}

/// Recursive factorial.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Factorial {
    pub n: u64,
}

impl Default for Factorial {
    fn default() -> Self {
        Self { n: 5 }
    }
}

const MAX_FACTORIAL: u64 = 20;

const FACTORIAL: &str = "\
factorial(n):
    if n <= 1: return 1
    return n * factorial(n - 1)";

fn factorial(n: u64, t: &mut Trace) -> u64 {
    if n <= 1 {
        t.at(2, format!("factorial({}) = 1", n));
        return 1;
    }
    t.at(3, format!("factorial({}) calls factorial({})", n, n - 1));
    let inner = factorial(n - 1, t);
    let result = n * inner;
    t.at(3, format!("factorial({}) = {} * {} = {}", n, n, inner, result));
    result
}

impl Algorithm for Factorial {
    fn source(&self) -> &'static str {
        FACTORIAL
    }

    fn validate(&self) -> Result<()> {
        if self.n > MAX_FACTORIAL {
            return Err(out_of_range("n", self.n, 0, MAX_FACTORIAL));
        }
        Ok(())
    }

    fn trace(&self) -> Trace {
        let mut t = Trace::new();
        t.at(1, format!("Call factorial({})", self.n));
        let result = factorial(self.n, &mut t);
        t.note(format!("{}! = {}", self.n, result));
        t
    }
}

/// Towers of Hanoi from peg A to peg C.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TowersOfHanoi {
    pub disks: u32,
}

impl Default for TowersOfHanoi {
    fn default() -> Self {
        Self { disks: 3 }
    }
}

const MAX_DISKS: u32 = 10;

const HANOI: &str = "\
hanoi(n, from, to, via):
    if n == 0: return
    hanoi(n - 1, from, via, to)
    move disk n from `from` to `to`
    hanoi(n - 1, via, to, from)";

fn hanoi(n: u32, from: char, to: char, via: char, moves: &mut u32, t: &mut Trace) {
    if n == 0 {
        return;
    }
    hanoi(n - 1, from, via, to, moves, t);
    *moves += 1;
    t.at(4, format!("Move disk {} from {} to {}", n, from, to));
    hanoi(n - 1, via, to, from, moves, t);
}

impl Algorithm for TowersOfHanoi {
    fn source(&self) -> &'static str {
        HANOI
    }

    fn validate(&self) -> Result<()> {
        if self.disks == 0 || self.disks > MAX_DISKS {
            return Err(out_of_range("disks", self.disks, 1, MAX_DISKS as u64));
        }
        Ok(())
    }

    fn trace(&self) -> Trace {
        let mut t = Trace::new();
        let mut moves = 0;
        t.at(1, format!("hanoi({}, A, C, B)", self.disks));
        hanoi(self.disks, 'A', 'C', 'B', &mut moves, &mut t);
        t.note(format!("Solved {} disks in {} moves", self.disks, moves));
        t
    }
}

/// Fewest coins summing to `amount`, bottom-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinChange {
    pub coins: Vec<u32>,
    pub amount: u32,
}

impl Default for CoinChange {
    fn default() -> Self {
        Self {
            coins: vec![1, 2, 5],
            amount: 11,
        }
    }
}

const MAX_COINS: usize = 10;
const MAX_AMOUNT: u32 = 200;

const COIN_CHANGE: &str = "\
best[0] = 0; best[1..=amount] = inf
for a in 1..=amount:
    for c in coins:
        if c <= a and best[a - c] + 1 < best[a]:
            best[a] = best[a - c] + 1; last[a] = c
walk last[] back from amount to list the coins";

impl Algorithm for CoinChange {
    fn source(&self) -> &'static str {
        COIN_CHANGE
    }

    fn validate(&self) -> Result<()> {
        check_len("coins", self.coins.len(), 1, MAX_COINS)?;
        if self.coins.contains(&0) {
            return Err(Error::InvalidInput("coins must be positive".to_string()));
        }
        if self.amount > MAX_AMOUNT {
            return Err(out_of_range("amount", self.amount, 0, MAX_AMOUNT as u64));
        }
        Ok(())
    }

    fn trace(&self) -> Trace {
        let amount = self.amount as usize;
        let mut best: Vec<Option<u32>> = vec![None; amount + 1];
        let mut last = vec![0u32; amount + 1];
        let mut t = Trace::new();

        best[0] = Some(0);
        t.at(1, "best[0] = 0");
        for a in 1..=amount {
            for &c in &self.coins {
                let c_usize = c as usize;
                if c_usize > a {
                    continue;
                }
                let Some(prev) = best[a - c_usize] else {
                    continue;
                };
                if best[a].map_or(true, |current| prev + 1 < current) {
                    best[a] = Some(prev + 1);
                    last[a] = c;
                    t.span(
                        LineRange::new(4, 5),
                        format!("best[{}] = {} using coin {}", a, prev + 1, c),
                    );
                }
            }
        }

        let summary = match best[amount] {
            None => format!("{} cannot be made from {:?}", amount, self.coins),
            Some(0) => format!("{} needs no coins", amount),
            Some(count) => {
                let mut used = Vec::with_capacity(count as usize);
                let mut rest = amount;
                while rest > 0 {
                    used.push(last[rest]);
                    rest -= last[rest] as usize;
                }
                used.sort_by(|a, b| b.cmp(a));
                let terms = used
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(" + ");
                format!("{} = {} ({} coins)", amount, terms, count)
            }
        };
        t.at(6, summary);
        t
    }
}

/// Largest sum along a path from the top-left to the bottom-right cell,
/// moving only right or down.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxSumPath {
    pub grid: Vec<Vec<i64>>,
}

impl Default for MaxSumPath {
    fn default() -> Self {
        Self {
            grid: vec![vec![5, 3, 2, 1], vec![1, 2, 10, 1], vec![4, 3, 2, 20]],
        }
    }
}

const MAX_GRID: usize = 12;

const MAX_SUM_PATH: &str = "\
best[0][0] = grid[0][0]
for each cell (r, c) in row-major order:
    from_up = best[r - 1][c] if r > 0
    from_left = best[r][c - 1] if c > 0
    best[r][c] = grid[r][c] + max(from_up, from_left)
return best[rows - 1][cols - 1]";

impl Algorithm for MaxSumPath {
    fn source(&self) -> &'static str {
        MAX_SUM_PATH
    }

    fn validate(&self) -> Result<()> {
        check_len("grid", self.grid.len(), 1, MAX_GRID)?;
        let cols = self.grid[0].len();
        check_len("grid row", cols, 1, MAX_GRID)?;
        if self.grid.iter().any(|row| row.len() != cols) {
            return Err(Error::InvalidInput(
                "grid rows must all have the same length".to_string(),
            ));
        }
        for &cell in self.grid.iter().flatten() {
            check_magnitude("grid cell", cell)?;
        }
        Ok(())
    }

    fn trace(&self) -> Trace {
        let grid = &self.grid;
        let (rows, cols) = (grid.len(), grid[0].len());
        let mut best = vec![vec![0i64; cols]; rows];
        let mut t = Trace::new();

        best[0][0] = grid[0][0];
        t.at(1, format!("best[0][0] = {}", grid[0][0]));
        for r in 0..rows {
            for c in 0..cols {
                let from = match (r > 0, c > 0) {
                    (false, false) => continue,
                    (true, false) => best[r - 1][c],
                    (false, true) => best[r][c - 1],
                    (true, true) => best[r - 1][c].max(best[r][c - 1]),
                };
                best[r][c] = grid[r][c] + from;
                t.span(
                    LineRange::new(3, 5),
                    format!("best[{}][{}] = {} + {} = {}", r, c, grid[r][c], from, best[r][c]),
                );
            }
        }

        let mut path = vec![grid[rows - 1][cols - 1]];
        let (mut r, mut c) = (rows - 1, cols - 1);
        while r > 0 || c > 0 {
            if c == 0 || (r > 0 && best[r - 1][c] >= best[r][c - 1]) {
                r -= 1;
            } else {
                c -= 1;
            }
            path.push(grid[r][c]);
        }
        path.reverse();

        t.at(
            6,
            format!("Max path sum {} via {:?}", best[rows - 1][cols - 1], path),
        );
        t
    }
}

/// An item that may be taken in part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub weight: u64,
    pub value: u64,
}

/// Greedy fractional knapsack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FractionalKnapsack {
    pub items: Vec<Item>,
    pub capacity: u64,
}

impl Default for FractionalKnapsack {
    fn default() -> Self {
        Self {
            items: vec![
                Item {
                    weight: 10,
                    value: 60,
                },
                Item {
                    weight: 20,
                    value: 100,
                },
                Item {
                    weight: 30,
                    value: 120,
                },
            ],
            capacity: 50,
        }
    }
}

const MAX_ITEMS: usize = 16;

const KNAPSACK: &str = "\
sort items by value / weight, highest first
for item in items:
    if capacity == 0: break
    take = min(item.weight, capacity)
    total += item.value * take / item.weight; capacity -= take
return total";

impl Algorithm for FractionalKnapsack {
    fn source(&self) -> &'static str {
        KNAPSACK
    }

    fn validate(&self) -> Result<()> {
        check_len("items", self.items.len(), 1, MAX_ITEMS)?;
        if self.items.iter().any(|item| item.weight == 0) {
            return Err(Error::InvalidInput("item weights must be positive".to_string()));
        }
        Ok(())
    }

    fn trace(&self) -> Trace {
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        // Compare value/weight ratios without going through floats.
        order.sort_by(|&a, &b| {
            let (a, b) = (self.items[a], self.items[b]);
            (b.value as u128 * a.weight as u128).cmp(&(a.value as u128 * b.weight as u128))
        });
        let mut t = Trace::new();
        t.at(
            1,
            format!(
                "By value per weight: {:?}",
                order.iter().map(|i| i + 1).collect::<Vec<_>>()
            ),
        );

        let mut capacity = self.capacity;
        let mut total = 0.0;
        for index in order {
            if capacity == 0 {
                t.at(3, "Knapsack is full");
                break;
            }
            let item = self.items[index];
            let take = item.weight.min(capacity);
            let gained = item.value as f64 * take as f64 / item.weight as f64;
            total += gained;
            capacity -= take;
            t.span(
                LineRange::new(4, 5),
                format!(
                    "Take {}/{} of item {} (value {:.2}), {} capacity left",
                    take,
                    item.weight,
                    index + 1,
                    gained,
                    capacity
                ),
            );
        }

        t.at(6, format!("Total value {:.2}", total));
        t
    }
}

/// Knapsack with repetition: every item may be taken any number of times.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnboundedKnapsack {
    pub items: Vec<Item>,
    pub capacity: u64,
}

impl Default for UnboundedKnapsack {
    fn default() -> Self {
        let items = [(1, 10), (3, 40), (4, 50), (5, 70)]
            .into_iter()
            .map(|(weight, value)| Item { weight, value })
            .collect();
        Self { items, capacity: 8 }
    }
}

const MAX_CAPACITY: u64 = 200;
const MAX_ITEM_VALUE: u64 = 1_000_000;

const KNAPSACK_REPETITION: &str = "\
best[0..=capacity] = 0
for c in 1..=capacity:
    for item in items:
        if item.weight <= c and best[c - item.weight] + item.value > best[c]:
            best[c] = best[c - item.weight] + item.value; choice[c] = item
walk choice[] back from capacity to list the items";

impl Algorithm for UnboundedKnapsack {
    fn source(&self) -> &'static str {
        KNAPSACK_REPETITION
    }

    fn validate(&self) -> Result<()> {
        check_len("items", self.items.len(), 1, MAX_ITEMS)?;
        if self.items.iter().any(|item| item.weight == 0) {
            return Err(Error::InvalidInput("item weights must be positive".to_string()));
        }
        if let Some(item) = self.items.iter().find(|item| item.value > MAX_ITEM_VALUE) {
            return Err(out_of_range("item value", item.value, 0, MAX_ITEM_VALUE));
        }
        if self.capacity > MAX_CAPACITY {
            return Err(out_of_range("capacity", self.capacity, 0, MAX_CAPACITY));
        }
        Ok(())
    }

    fn trace(&self) -> Trace {
        let capacity = self.capacity as usize;
        let mut best = vec![0u64; capacity + 1];
        let mut choice: Vec<Option<usize>> = vec![None; capacity + 1];
        let mut t = Trace::new();
        t.at(1, format!("best[0..={}] = 0", capacity));

        for c in 1..=capacity {
            for (index, item) in self.items.iter().enumerate() {
                let weight = item.weight as usize;
                if weight > c {
                    continue;
                }
                let candidate = best[c - weight] + item.value;
                if candidate > best[c] {
                    best[c] = candidate;
                    choice[c] = Some(index);
                    t.span(
                        LineRange::new(4, 5),
                        format!("best[{}] = {} with item {}", c, candidate, index + 1),
                    );
                }
            }
        }

        let mut taken = Vec::new();
        let mut rest = capacity;
        while let Some(index) = choice[rest] {
            taken.push(index + 1);
            rest -= self.items[index].weight as usize;
        }
        taken.sort_unstable();
        t.at(
            6,
            format!("Best value {} using items {:?}", best[capacity], taken),
        );
        t
    }
}

/// A named city in the plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl City {
    fn new(name: &str, x: f64, y: f64) -> Self {
        Self {
            name: name.to_string(),
            x,
            y,
        }
    }

    fn distance(&self, other: &City) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Brute-force traveling salesman over every tour starting at the first city.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelingSalesman {
    pub cities: Vec<City>,
}

impl Default for TravelingSalesman {
    fn default() -> Self {
        Self {
            cities: vec![
                City::new("A", 0.0, 0.0),
                City::new("B", 0.0, 3.0),
                City::new("C", 4.0, 3.0),
                City::new("D", 4.0, 0.0),
                City::new("E", 2.0, -1.0),
            ],
        }
    }
}

const MAX_CITIES: usize = 7;

const TRAVELING_SALESMAN: &str = "\
fix city 0 as the start
for each ordering of the remaining cities:
    length = tour length, returning to city 0
    if length < best: best = length; best_tour = ordering
return best_tour";

/// Rearranges `a` into the next lexicographic permutation. Returns `false`
/// once `a` is the last one.
fn next_permutation(a: &mut [usize]) -> bool {
    if a.len() < 2 {
        return false;
    }
    let mut i = a.len() - 1;
    while i > 0 && a[i - 1] >= a[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = a.len() - 1;
    while a[j] <= a[i - 1] {
        j -= 1;
    }
    a.swap(i - 1, j);
    a[i..].reverse();
    true
}

impl TravelingSalesman {
    fn tour_length(&self, order: &[usize]) -> f64 {
        let mut length = 0.0;
        let mut at = 0;
        for &next in order.iter().chain(std::iter::once(&0)) {
            length += self.cities[at].distance(&self.cities[next]);
            at = next;
        }
        length
    }

    fn describe(&self, order: &[usize]) -> String {
        std::iter::once(&0)
            .chain(order)
            .chain(std::iter::once(&0))
            .map(|&i| self.cities[i].name.as_str())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl Algorithm for TravelingSalesman {
    fn source(&self) -> &'static str {
        TRAVELING_SALESMAN
    }

    fn validate(&self) -> Result<()> {
        check_len("cities", self.cities.len(), 2, MAX_CITIES)?;
        if self
            .cities
            .iter()
            .any(|city| !city.x.is_finite() || !city.y.is_finite())
        {
            return Err(Error::InvalidInput(
                "city coordinates must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn trace(&self) -> Trace {
        let mut t = Trace::new();
        t.at(1, format!("Start at {}", self.cities[0].name));

        let mut order: Vec<usize> = (1..self.cities.len()).collect();
        let mut best: Option<(f64, Vec<usize>)> = None;
        loop {
            let length = self.tour_length(&order);
            t.span(
                LineRange::new(2, 3),
                format!("Tour {}: {:.2}", self.describe(&order), length),
            );
            let improves = best.as_ref().map_or(true, |(current, _)| {
                length.partial_cmp(current) == Some(Ordering::Less)
            });
            if improves {
                t.at(4, format!("New best {:.2}", length));
                best = Some((length, order.clone()));
            }
            if !next_permutation(&mut order) {
                break;
            }
        }

        if let Some((length, tour)) = best {
            t.at(
                5,
                format!("Best tour {} with length {:.2}", self.describe(&tour), length),
            );
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorial() {
        assert_eq!(Factorial::default().trace().last_message(), Some("5! = 120"));
        assert_eq!(Factorial { n: 0 }.trace().last_message(), Some("0! = 1"));
        assert_eq!(
            Factorial { n: 20 }.trace().last_message(),
            Some("20! = 2432902008176640000")
        );
        assert!(Factorial { n: 21 }.validate().is_err());
    }

    #[test]
    fn test_hanoi() {
        let trace = TowersOfHanoi::default().trace();
        assert_eq!(trace.last_message(), Some("Solved 3 disks in 7 moves"));
        assert_eq!(trace.steps()[1].message, "Move disk 1 from A to C");
        assert_eq!(
            TowersOfHanoi { disks: 10 }.trace().last_message(),
            Some("Solved 10 disks in 1023 moves")
        );
        assert!(TowersOfHanoi { disks: 0 }.validate().is_err());
    }

    #[test]
    fn test_coin_change() {
        assert_eq!(
            CoinChange::default().trace().last_message(),
            Some("11 = 5 + 5 + 1 (3 coins)")
        );
        let greedy_fails = CoinChange {
            coins: vec![1, 3, 4],
            amount: 6,
        };
        assert_eq!(greedy_fails.trace().last_message(), Some("6 = 3 + 3 (2 coins)"));
    }

    #[test]
    fn test_coin_change_edges() {
        let impossible = CoinChange {
            coins: vec![2],
            amount: 3,
        };
        assert_eq!(
            impossible.trace().last_message(),
            Some("3 cannot be made from [2]")
        );
        let zero = CoinChange {
            coins: vec![2],
            amount: 0,
        };
        assert_eq!(zero.trace().last_message(), Some("0 needs no coins"));
        let bad = CoinChange {
            coins: vec![0, 1],
            amount: 3,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_max_sum_path() {
        assert_eq!(
            MaxSumPath::default().trace().last_message(),
            Some("Max path sum 42 via [5, 3, 2, 10, 2, 20]")
        );
        let single = MaxSumPath {
            grid: vec![vec![-4]],
        };
        assert_eq!(single.trace().last_message(), Some("Max path sum -4 via [-4]"));
    }

    #[test]
    fn test_max_sum_path_rejects_ragged_grid() {
        let ragged = MaxSumPath {
            grid: vec![vec![1, 2], vec![3]],
        };
        assert!(ragged.validate().is_err());
        assert!(MaxSumPath { grid: vec![] }.validate().is_err());
    }

    #[test]
    fn test_fractional_knapsack() {
        let trace = FractionalKnapsack::default().trace();
        assert_eq!(trace.last_message(), Some("Total value 240.00"));
        assert!(trace
            .messages()
            .any(|m| m == "Take 20/30 of item 3 (value 80.00), 0 capacity left"));
    }

    #[test]
    fn test_knapsack_stops_when_full() {
        let knapsack = FractionalKnapsack {
            capacity: 10,
            ..FractionalKnapsack::default()
        };
        let trace = knapsack.trace();
        assert!(trace.messages().any(|m| m == "Knapsack is full"));
        assert_eq!(trace.last_message(), Some("Total value 60.00"));
    }

    #[test]
    fn test_unbounded_knapsack() {
        let trace = UnboundedKnapsack::default().trace();
        assert_eq!(trace.last_message(), Some("Best value 110 using items [2, 4]"));
        assert!(trace.messages().any(|m| m == "best[5] = 70 with item 4"));
    }

    #[test]
    fn test_unbounded_knapsack_repeats_items() {
        let knapsack = UnboundedKnapsack {
            items: vec![
                Item {
                    weight: 2,
                    value: 3,
                },
                Item {
                    weight: 7,
                    value: 9,
                },
            ],
            capacity: 7,
        };
        assert_eq!(
            knapsack.trace().last_message(),
            Some("Best value 9 using items [1, 1, 1]")
        );

        let nothing_fits = UnboundedKnapsack {
            capacity: 1,
            items: vec![Item {
                weight: 2,
                value: 5,
            }],
        };
        assert_eq!(
            nothing_fits.trace().last_message(),
            Some("Best value 0 using items []")
        );
    }

    #[test]
    fn test_unbounded_knapsack_limits() {
        let too_big = UnboundedKnapsack {
            capacity: MAX_CAPACITY + 1,
            ..UnboundedKnapsack::default()
        };
        assert!(too_big.validate().is_err());

        let priceless = UnboundedKnapsack {
            items: vec![Item {
                weight: 1,
                value: u64::MAX,
            }],
            capacity: 8,
        };
        assert!(priceless.validate().is_err());
        assert!(UnboundedKnapsack::default().validate().is_ok());
    }

    #[test]
    fn test_next_permutation() {
        let mut a = vec![1, 2, 3];
        let mut seen = vec![a.clone()];
        while next_permutation(&mut a) {
            seen.push(a.clone());
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(seen.last().unwrap(), &vec![3, 2, 1]);
    }

    #[test]
    fn test_traveling_salesman() {
        assert_eq!(
            TravelingSalesman::default().trace().last_message(),
            Some("Best tour A-B-C-D-E-A with length 14.47")
        );

        let square = TravelingSalesman {
            cities: vec![
                City::new("P", 0.0, 0.0),
                City::new("Q", 1.0, 0.0),
                City::new("R", 1.0, 1.0),
                City::new("S", 0.0, 1.0),
            ],
        };
        let trace = square.trace();
        assert_eq!(trace.last_message(), Some("Best tour P-Q-R-S-P with length 4.00"));
        assert_eq!(trace.messages().filter(|m| m.starts_with("Tour ")).count(), 6);
    }

    #[test]
    fn test_traveling_salesman_limits() {
        let one = TravelingSalesman {
            cities: vec![City::new("A", 0.0, 0.0)],
        };
        assert!(one.validate().is_err());
        let bad = TravelingSalesman {
            cities: vec![City::new("A", 0.0, 0.0), City::new("B", f64::NAN, 0.0)],
        };
        assert!(bad.validate().is_err());
    }
}
