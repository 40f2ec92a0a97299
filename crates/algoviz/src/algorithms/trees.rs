//! Tree structures: a binary min-heap, an unbalanced binary search tree and
//! the self-balancing AVL, B-tree and red-black insertions.

use super::{check_len, Algorithm, Trace};
use crate::error::{Error, Result};
use crate::store::LineRange;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;

const MAX_KEYS: usize = 48;

/// Inserts every value into a min-heap, then extracts them all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryHeap {
    pub values: Vec<i64>,
}

impl Default for BinaryHeap {
    fn default() -> Self {
        Self {
            values: vec![15, 4, 22, 8, 1, 17, 9],
        }
    }
}

const BINARY_HEAP: &str = "\
insert(h, x):
    h.push(x); i = len(h) - 1
    while i > 0 and h[parent(i)] > h[i]:
        swap(h[i], h[parent(i)]); i = parent(i)
extract_min(h):
    min = h[0]; h[0] = h.pop()
    sift_down(h, 0)
    return min";

impl Algorithm for BinaryHeap {
    fn source(&self) -> &'static str {
        BINARY_HEAP
    }

    fn validate(&self) -> Result<()> {
        check_len("values", self.values.len(), 0, MAX_KEYS)
    }

    fn trace(&self) -> Trace {
        let mut heap: Vec<i64> = Vec::with_capacity(self.values.len());
        let mut t = Trace::new();

        for &value in &self.values {
            heap.push(value);
            let mut i = heap.len() - 1;
            t.at(2, format!("Insert {} at index {}", value, i));
            while i > 0 {
                let parent = (i - 1) / 2;
                if heap[parent] <= heap[i] {
                    break;
                }
                heap.swap(i, parent);
                t.span(
                    LineRange::new(3, 4),
                    format!("{} < parent {}: move up to index {}", value, heap[i], parent),
                );
                i = parent;
            }
        }
        t.note(format!("Heap: {:?}", heap));

        let mut extracted = Vec::with_capacity(heap.len());
        while !heap.is_empty() {
            let last = heap.len() - 1;
            heap.swap(0, last);
            let min = heap.pop().unwrap_or_default();
            t.at(6, format!("Extract min {}", min));
            extracted.push(min);

            let n = heap.len();
            let mut i = 0;
            loop {
                let mut smallest = i;
                for child in [2 * i + 1, 2 * i + 2] {
                    if child < n && heap[child] < heap[smallest] {
                        smallest = child;
                    }
                }
                if smallest == i {
                    break;
                }
                heap.swap(i, smallest);
                t.at(7, format!("Sift {} down to index {}", heap[smallest], smallest));
                i = smallest;
            }
        }

        t.note(format!("Extracted in order: {:?}", extracted));
        t
    }
}

/// Builds a binary search tree, then walks it in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryTree {
    pub values: Vec<i64>,
}

impl Default for BinaryTree {
    fn default() -> Self {
        Self {
            values: vec![50, 30, 70, 20, 40, 60, 80, 35],
        }
    }
}

const BINARY_TREE: &str = "\
insert(node, x):
    if node is empty: return new node(x)
    if x < node.key: node.left = insert(node.left, x)
    else if x > node.key: node.right = insert(node.right, x)
    return node
in_order(node):
    if node is empty: return
    in_order(node.left); visit(node); in_order(node.right)";

struct Node {
    key: i64,
    left: Option<usize>,
    right: Option<usize>,
}

fn in_order(nodes: &[Node], at: Option<usize>, out: &mut Vec<i64>, t: &mut Trace) {
    let Some(index) = at else {
        return;
    };
    in_order(nodes, nodes[index].left, out, t);
    out.push(nodes[index].key);
    t.at(8, format!("Visit {}", nodes[index].key));
    in_order(nodes, nodes[index].right, out, t);
}

impl Algorithm for BinaryTree {
    fn source(&self) -> &'static str {
        BINARY_TREE
    }

    fn validate(&self) -> Result<()> {
        check_len("values", self.values.len(), 0, MAX_KEYS)
    }

    fn trace(&self) -> Trace {
        let mut nodes: Vec<Node> = Vec::with_capacity(self.values.len());
        let mut t = Trace::new();

        for &key in &self.values {
            if nodes.is_empty() {
                nodes.push(Node {
                    key,
                    left: None,
                    right: None,
                });
                t.at(2, format!("Insert {} as root", key));
                continue;
            }

            let index = nodes.len();
            let mut at = 0;
            let inserted = loop {
                let current = nodes[at].key;
                let next = if key < current {
                    t.at(3, format!("{} < {}: go left", key, current));
                    &mut nodes[at].left
                } else if key > current {
                    t.at(4, format!("{} > {}: go right", key, current));
                    &mut nodes[at].right
                } else {
                    t.at(5, format!("{} already present", key));
                    break false;
                };
                match *next {
                    Some(child) => at = child,
                    None => {
                        *next = Some(index);
                        t.at(2, format!("Insert {} under {}", key, current));
                        break true;
                    }
                }
            };
            if inserted {
                nodes.push(Node {
                    key,
                    left: None,
                    right: None,
                });
            }
        }

        let mut order = Vec::with_capacity(nodes.len());
        let root = if nodes.is_empty() { None } else { Some(0) };
        in_order(&nodes, root, &mut order, &mut t);
        t.note(format!("In-order: {:?}", order));
        t
    }
}

fn describe_keys(keys: &[String]) -> String {
    format!("[{}]", keys.join(", "))
}

struct AvlNode {
    key: i64,
    height: i32,
    left: Option<usize>,
    right: Option<usize>,
}

/// Arena-backed AVL tree.
#[derive(Default)]
struct Avl {
    nodes: Vec<AvlNode>,
    root: Option<usize>,
}

impl Avl {
    fn height(&self, at: Option<usize>) -> i32 {
        at.map_or(0, |i| self.nodes[i].height)
    }

    fn balance(&self, i: usize) -> i32 {
        self.height(self.nodes[i].left) - self.height(self.nodes[i].right)
    }

    fn refresh(&mut self, i: usize) {
        let (left, right) = (self.nodes[i].left, self.nodes[i].right);
        self.nodes[i].height = 1 + self.height(left).max(self.height(right));
    }

    fn rotate_right(&mut self, y: usize, t: &mut Trace) -> usize {
        let Some(x) = self.nodes[y].left else {
            return y;
        };
        self.nodes[y].left = self.nodes[x].right;
        self.nodes[x].right = Some(y);
        self.refresh(y);
        self.refresh(x);
        t.at(9, format!("Rotate right at {}", self.nodes[y].key));
        x
    }

    fn rotate_left(&mut self, x: usize, t: &mut Trace) -> usize {
        let Some(y) = self.nodes[x].right else {
            return x;
        };
        self.nodes[x].right = self.nodes[y].left;
        self.nodes[y].left = Some(x);
        self.refresh(x);
        self.refresh(y);
        t.at(11, format!("Rotate left at {}", self.nodes[x].key));
        y
    }

    fn insert(&mut self, key: i64, t: &mut Trace) {
        let root = self.root;
        self.root = Some(self.insert_at(root, key, t));
    }

    fn insert_at(&mut self, at: Option<usize>, key: i64, t: &mut Trace) -> usize {
        let Some(i) = at else {
            self.nodes.push(AvlNode {
                key,
                height: 1,
                left: None,
                right: None,
            });
            t.at(2, format!("Place {}", key));
            return self.nodes.len() - 1;
        };

        let current = self.nodes[i].key;
        match key.cmp(&current) {
            Ordering::Less => {
                t.at(3, format!("{} < {}: go left", key, current));
                let left = self.nodes[i].left;
                let child = self.insert_at(left, key, t);
                self.nodes[i].left = Some(child);
            }
            Ordering::Greater => {
                t.at(4, format!("{} > {}: go right", key, current));
                let right = self.nodes[i].right;
                let child = self.insert_at(right, key, t);
                self.nodes[i].right = Some(child);
            }
            Ordering::Equal => {
                t.at(5, format!("{} already present", key));
                return i;
            }
        }

        self.refresh(i);
        let balance = self.balance(i);
        t.span(
            LineRange::new(6, 7),
            format!(
                "{}: height {}, balance {}",
                current, self.nodes[i].height, balance
            ),
        );

        if balance > 1 {
            if let Some(left) = self.nodes[i].left {
                if key > self.nodes[left].key {
                    t.at(8, format!("Left-right case at {}", current));
                    let pivot = self.rotate_left(left, t);
                    self.nodes[i].left = Some(pivot);
                }
            }
            return self.rotate_right(i, t);
        }
        if balance < -1 {
            if let Some(right) = self.nodes[i].right {
                if key < self.nodes[right].key {
                    t.at(10, format!("Right-left case at {}", current));
                    let pivot = self.rotate_right(right, t);
                    self.nodes[i].right = Some(pivot);
                }
            }
            return self.rotate_left(i, t);
        }
        i
    }

    fn pre_order(&self, at: Option<usize>, out: &mut Vec<i64>) {
        if let Some(i) = at {
            out.push(self.nodes[i].key);
            self.pre_order(self.nodes[i].left, out);
            self.pre_order(self.nodes[i].right, out);
        }
    }
}

/// Inserts every value into an AVL tree, rebalancing with rotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvlTree {
    pub values: Vec<i64>,
}

impl Default for AvlTree {
    fn default() -> Self {
        Self {
            values: vec![10, 20, 30, 40, 50, 25],
        }
    }
}

const AVL_TREE: &str = "\
insert(node, x):
    if node is empty: return new node(x)
    if x < node.key: node.left = insert(node.left, x)
    else if x > node.key: node.right = insert(node.right, x)
    else: return node
    node.height = 1 + max(height(node.left), height(node.right))
    balance = height(node.left) - height(node.right)
    if balance > 1 and x > node.left.key: node.left = rotate_left(node.left)
    if balance > 1: return rotate_right(node)
    if balance < -1 and x < node.right.key: node.right = rotate_right(node.right)
    if balance < -1: return rotate_left(node)
    return node";

impl Algorithm for AvlTree {
    fn source(&self) -> &'static str {
        AVL_TREE
    }

    fn validate(&self) -> Result<()> {
        check_len("values", self.values.len(), 0, MAX_KEYS)
    }

    fn trace(&self) -> Trace {
        let mut tree = Avl::default();
        let mut t = Trace::new();
        for &key in &self.values {
            tree.insert(key, &mut t);
        }

        let mut order = Vec::with_capacity(tree.nodes.len());
        tree.pre_order(tree.root, &mut order);
        t.note(format!(
            "Pre-order: {:?}, height {}",
            order,
            tree.height(tree.root)
        ));
        t
    }
}

const MIN_DEGREE: usize = 2;
const MAX_DEGREE: usize = 4;

struct BNode {
    keys: Vec<i64>,
    children: Vec<usize>,
}

impl BNode {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-backed B-tree with proactive splitting on the way down.
struct BTreeArena {
    degree: usize,
    nodes: Vec<BNode>,
    root: usize,
}

impl BTreeArena {
    fn new(degree: usize) -> Self {
        Self {
            degree,
            nodes: vec![BNode {
                keys: Vec::new(),
                children: Vec::new(),
            }],
            root: 0,
        }
    }

    fn is_full(&self, i: usize) -> bool {
        self.nodes[i].keys.len() == 2 * self.degree - 1
    }

    fn contains(&self, key: i64) -> bool {
        let mut at = self.root;
        loop {
            let node = &self.nodes[at];
            match node.keys.binary_search(&key) {
                Ok(_) => return true,
                Err(_) if node.is_leaf() => return false,
                Err(i) => at = node.children[i],
            }
        }
    }

    /// Splits the full `i`-th child of `parent`, moving its median up.
    fn split_child(&mut self, parent: usize, i: usize, t: &mut Trace) {
        let degree = self.degree;
        let full = self.nodes[parent].children[i];
        let keys = self.nodes[full].keys.split_off(degree);
        let children = if self.nodes[full].is_leaf() {
            Vec::new()
        } else {
            self.nodes[full].children.split_off(degree)
        };
        let Some(median) = self.nodes[full].keys.pop() else {
            return;
        };

        let sibling = self.nodes.len();
        self.nodes.push(BNode { keys, children });
        self.nodes[parent].keys.insert(i, median);
        self.nodes[parent].children.insert(i + 1, sibling);
        t.at(
            6,
            format!(
                "Split: {} moves up, leaving {} and {}",
                median,
                describe_b_keys(&self.nodes[full].keys),
                describe_b_keys(&self.nodes[sibling].keys)
            ),
        );
    }

    fn insert(&mut self, key: i64, t: &mut Trace) {
        if self.contains(key) {
            t.note(format!("{} already present", key));
            return;
        }

        if self.is_full(self.root) {
            let old_root = self.root;
            self.root = self.nodes.len();
            self.nodes.push(BNode {
                keys: Vec::new(),
                children: vec![old_root],
            });
            t.at(2, "Root is full: add a new root above it");
            self.split_child(self.root, 0, t);
        }

        let mut at = self.root;
        t.at(3, format!("Insert {} starting at the root", key));
        while !self.nodes[at].is_leaf() {
            let mut i = self.nodes[at].keys.partition_point(|&k| k < key);
            t.at(5, format!("{} belongs under child {}", key, i));
            if self.is_full(self.nodes[at].children[i]) {
                self.split_child(at, i, t);
                if key > self.nodes[at].keys[i] {
                    i += 1;
                }
            }
            at = self.nodes[at].children[i];
            t.at(7, format!("Descend to {}", describe_b_keys(&self.nodes[at].keys)));
        }

        let leaf = &mut self.nodes[at];
        let position = leaf.keys.partition_point(|&k| k < key);
        leaf.keys.insert(position, key);
        t.at(8, format!("Leaf is now {}", describe_b_keys(&leaf.keys)));
    }

    /// Nodes level by level, e.g. `[10, 20] | [5, 6] [12] [30]`.
    fn levels(&self) -> String {
        let mut levels = Vec::new();
        let mut queue = VecDeque::from([self.root]);
        while !queue.is_empty() {
            let mut level = Vec::with_capacity(queue.len());
            for _ in 0..queue.len() {
                let Some(i) = queue.pop_front() else {
                    break;
                };
                level.push(describe_b_keys(&self.nodes[i].keys));
                queue.extend(self.nodes[i].children.iter().copied());
            }
            levels.push(level.join(" "));
        }
        levels.join(" | ")
    }
}

fn describe_b_keys(keys: &[i64]) -> String {
    describe_keys(&keys.iter().map(i64::to_string).collect::<Vec<_>>())
}

/// Inserts every value into a B-tree of the given minimum degree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BTree {
    pub values: Vec<i64>,
    /// Every node but the root holds between `min_degree - 1` and
    /// `2 * min_degree - 1` keys.
    pub min_degree: usize,
}

impl Default for BTree {
    fn default() -> Self {
        Self {
            values: vec![10, 20, 5, 6, 12, 30, 7, 17],
            min_degree: MIN_DEGREE,
        }
    }
}

const B_TREE: &str = "\
insert(tree, k):
    if root is full: split root, tree grows by one level
    node = root
    while node is internal:
        i = first child whose range holds k
        if child[i] is full: split child[i], median moves up
        node = child[i]
    insert k into node.keys in order";

impl Algorithm for BTree {
    fn source(&self) -> &'static str {
        B_TREE
    }

    fn validate(&self) -> Result<()> {
        check_len("values", self.values.len(), 0, MAX_KEYS)?;
        if !(MIN_DEGREE..=MAX_DEGREE).contains(&self.min_degree) {
            return Err(Error::InvalidInput(format!(
                "min_degree must be between {} and {}, got {}",
                MIN_DEGREE, MAX_DEGREE, self.min_degree
            )));
        }
        Ok(())
    }

    fn trace(&self) -> Trace {
        let mut tree = BTreeArena::new(self.min_degree);
        let mut t = Trace::new();
        for &key in &self.values {
            tree.insert(key, &mut t);
        }
        t.note(format!("B-tree: {}", tree.levels()));
        t
    }
}

struct RbNode {
    key: i64,
    red: bool,
    left: Option<usize>,
    right: Option<usize>,
    parent: Option<usize>,
}

/// Arena-backed red-black tree with parent links.
#[derive(Default)]
struct RedBlack {
    nodes: Vec<RbNode>,
    root: Option<usize>,
}

impl RedBlack {
    fn is_red(&self, at: Option<usize>) -> bool {
        at.is_some_and(|i| self.nodes[i].red)
    }

    fn relink(&mut self, old: usize, new: usize) {
        let parent = self.nodes[old].parent;
        self.nodes[new].parent = parent;
        match parent {
            None => self.root = Some(new),
            Some(p) if self.nodes[p].left == Some(old) => self.nodes[p].left = Some(new),
            Some(p) => self.nodes[p].right = Some(new),
        }
    }

    fn rotate_left(&mut self, x: usize) {
        let Some(y) = self.nodes[x].right else {
            return;
        };
        self.nodes[x].right = self.nodes[y].left;
        if let Some(inner) = self.nodes[y].left {
            self.nodes[inner].parent = Some(x);
        }
        self.relink(x, y);
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn rotate_right(&mut self, y: usize) {
        let Some(x) = self.nodes[y].left else {
            return;
        };
        self.nodes[y].left = self.nodes[x].right;
        if let Some(inner) = self.nodes[x].right {
            self.nodes[inner].parent = Some(y);
        }
        self.relink(y, x);
        self.nodes[x].right = Some(y);
        self.nodes[y].parent = Some(x);
    }

    fn insert(&mut self, key: i64, t: &mut Trace) {
        let mut parent = None;
        let mut at = self.root;
        let mut goes_left = false;
        while let Some(i) = at {
            let current = self.nodes[i].key;
            parent = Some(i);
            match key.cmp(&current) {
                Ordering::Less => {
                    goes_left = true;
                    at = self.nodes[i].left;
                }
                Ordering::Greater => {
                    goes_left = false;
                    at = self.nodes[i].right;
                }
                Ordering::Equal => {
                    t.at(2, format!("{} already present", key));
                    return;
                }
            }
        }

        let z = self.nodes.len();
        self.nodes.push(RbNode {
            key,
            red: true,
            left: None,
            right: None,
            parent,
        });
        match parent {
            None => {
                self.root = Some(z);
                t.at(2, format!("Insert {} as red root", key));
            }
            Some(p) => {
                if goes_left {
                    self.nodes[p].left = Some(z);
                } else {
                    self.nodes[p].right = Some(z);
                }
                let side = if goes_left { "left" } else { "right" };
                t.at(
                    2,
                    format!("Insert {} as red {} child of {}", key, side, self.nodes[p].key),
                );
            }
        }

        self.fix_up(z, t);

        if let Some(root) = self.root {
            if self.nodes[root].red {
                self.nodes[root].red = false;
                t.at(8, format!("Color root {} black", self.nodes[root].key));
            }
        }
    }

    fn fix_up(&mut self, mut z: usize, t: &mut Trace) {
        while let Some(mut p) = self.nodes[z].parent.filter(|&p| self.nodes[p].red) {
            let Some(g) = self.nodes[p].parent else {
                break;
            };
            let parent_is_left = self.nodes[g].left == Some(p);
            let uncle = if parent_is_left {
                self.nodes[g].right
            } else {
                self.nodes[g].left
            };
            t.at(3, format!("Parent {} of {} is red", self.nodes[p].key, self.nodes[z].key));

            if let Some(u) = uncle.filter(|&u| self.nodes[u].red) {
                self.nodes[p].red = false;
                self.nodes[u].red = false;
                self.nodes[g].red = true;
                t.span(
                    LineRange::new(4, 5),
                    format!(
                        "Uncle {} is red: recolor {} and {} black, {} red",
                        self.nodes[u].key, self.nodes[p].key, self.nodes[u].key, self.nodes[g].key
                    ),
                );
                z = g;
                continue;
            }

            let inner = if parent_is_left {
                self.nodes[p].right == Some(z)
            } else {
                self.nodes[p].left == Some(z)
            };
            if inner {
                if parent_is_left {
                    self.rotate_left(p);
                } else {
                    self.rotate_right(p);
                }
                t.at(
                    6,
                    format!(
                        "{} is an inner child: rotate {} at {}",
                        self.nodes[z].key,
                        if parent_is_left { "left" } else { "right" },
                        self.nodes[p].key
                    ),
                );
                std::mem::swap(&mut z, &mut p);
            }

            self.nodes[p].red = false;
            self.nodes[g].red = true;
            if parent_is_left {
                self.rotate_right(g);
            } else {
                self.rotate_left(g);
            }
            t.at(
                7,
                format!(
                    "Recolor {} black and {} red, rotate {} at {}",
                    self.nodes[p].key,
                    self.nodes[g].key,
                    if parent_is_left { "right" } else { "left" },
                    self.nodes[g].key
                ),
            );
        }
    }

    fn pre_order(&self, at: Option<usize>, out: &mut Vec<String>) {
        if let Some(i) = at {
            let node = &self.nodes[i];
            out.push(format!("{}{}", node.key, if node.red { 'R' } else { 'B' }));
            self.pre_order(node.left, out);
            self.pre_order(node.right, out);
        }
    }
}

/// Inserts every value into a red-black tree, recoloring and rotating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedBlackTree {
    pub values: Vec<i64>,
}

impl Default for RedBlackTree {
    fn default() -> Self {
        Self {
            values: vec![10, 20, 30, 15, 25, 5, 1],
        }
    }
}

const RED_BLACK_TREE: &str = "\
insert(tree, k):
    bst_insert(k) as a red node z
    while parent(z) is red:
        uncle = sibling of parent(z)
        if uncle is red: recolor parent, uncle, grandparent; z = grandparent
        else if z is an inner child: rotate parent outward; z = old parent
        else: recolor parent and grandparent; rotate grandparent away
    root.color = black";

impl Algorithm for RedBlackTree {
    fn source(&self) -> &'static str {
        RED_BLACK_TREE
    }

    fn validate(&self) -> Result<()> {
        check_len("values", self.values.len(), 0, MAX_KEYS)
    }

    fn trace(&self) -> Trace {
        let mut tree = RedBlack::default();
        let mut t = Trace::new();
        for &key in &self.values {
            tree.insert(key, &mut t);
        }

        let mut order = Vec::with_capacity(tree.nodes.len());
        tree.pre_order(tree.root, &mut order);
        t.note(format!("Pre-order: {}", describe_keys(&order)));
        t
    }
}
