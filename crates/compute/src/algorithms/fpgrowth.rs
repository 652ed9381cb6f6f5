//! FP-growth frequent itemset mining.
//!
//! Transactions are compressed into an FP-tree (items ordered by global
//! frequency), then mined recursively through conditional pattern bases.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct FpGrowthParams {
    /// Minimum fraction of transactions an itemset must appear in.
    pub min_support: f64,
}

impl Default for FpGrowthParams {
    fn default() -> Self {
        Self { min_support: 0.5 }
    }
}

impl FpGrowthParams {
    /// Absolute support threshold for `transactions` transactions, never
    /// below one.
    pub fn min_count(&self, transactions: usize) -> usize {
        ((self.min_support * transactions as f64).ceil() as usize).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequentItemset {
    /// Items in ascending order.
    pub items: Vec<String>,
    pub frequency: usize,
}

struct Node {
    item: usize,
    count: usize,
    parent: Option<usize>,
    children: HashMap<usize, usize>,
}

/// Arena-backed FP-tree over item ids.
struct FpTree {
    nodes: Vec<Node>,
    /// item id → nodes holding that item.
    header: HashMap<usize, Vec<usize>>,
}

impl FpTree {
    fn new() -> Self {
        Self {
            nodes: vec![Node {
                item: usize::MAX,
                count: 0,
                parent: None,
                children: HashMap::new(),
            }],
            header: HashMap::new(),
        }
    }

    /// Insert a path of item ids (already in tree order) with weight `count`.
    fn insert(&mut self, path: &[usize], count: usize) {
        let mut current = 0;
        for &item in path {
            let next = match self.nodes[current].children.get(&item) {
                Some(&child) => child,
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(Node {
                        item,
                        count: 0,
                        parent: Some(current),
                        children: HashMap::new(),
                    });
                    self.nodes[current].children.insert(item, id);
                    self.header.entry(item).or_default().push(id);
                    id
                }
            };
            self.nodes[next].count += count;
            current = next;
        }
    }

    /// Prefix paths leading to every node of `item`, each weighted by that
    /// node's count. Paths are returned root-first.
    fn prefix_paths(&self, item: usize) -> Vec<(Vec<usize>, usize)> {
        let Some(nodes) = self.header.get(&item) else {
            return Vec::new();
        };
        nodes
            .iter()
            .filter_map(|&node| {
                let mut path = Vec::new();
                let mut cursor = self.nodes[node].parent;
                while let Some(p) = cursor {
                    if p == 0 {
                        break;
                    }
                    path.push(self.nodes[p].item);
                    cursor = self.nodes[p].parent;
                }
                path.reverse();
                (!path.is_empty()).then_some((path, self.nodes[node].count))
            })
            .collect()
    }

    fn support(&self, item: usize) -> usize {
        self.header
            .get(&item)
            .map(|nodes| nodes.iter().map(|&n| self.nodes[n].count).sum())
            .unwrap_or(0)
    }
}

/// Build a tree from weighted transactions, keeping only items with support
/// at least `min_count`. Items inside a path are ordered by `rank`.
fn build_tree(transactions: &[(Vec<usize>, usize)], min_count: usize) -> (FpTree, Vec<usize>) {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for (items, weight) in transactions {
        for &item in items {
            *counts.entry(item).or_default() += weight;
        }
    }

    let mut frequent: Vec<usize> = counts
        .iter()
        .filter(|&(_, &c)| c >= min_count)
        .map(|(&item, _)| item)
        .collect();
    // Most frequent first; ties by id for a stable tree shape.
    frequent.sort_by(|a, b| counts[b].cmp(&counts[a]).then(a.cmp(b)));
    let rank: HashMap<usize, usize> = frequent.iter().enumerate().map(|(r, &i)| (i, r)).collect();

    let mut tree = FpTree::new();
    for (items, weight) in transactions {
        let mut path: Vec<usize> = items.iter().copied().filter(|i| rank.contains_key(i)).collect();
        path.sort_by_key(|i| rank[i]);
        if !path.is_empty() {
            tree.insert(&path, *weight);
        }
    }
    (tree, frequent)
}

fn mine(
    tree: &FpTree,
    frequent: &[usize],
    suffix: &[usize],
    min_count: usize,
    out: &mut Vec<(Vec<usize>, usize)>,
) {
    // Least frequent first, as in the classic formulation.
    for &item in frequent.iter().rev() {
        let support = tree.support(item);
        if support < min_count {
            continue;
        }
        let mut itemset = suffix.to_vec();
        itemset.push(item);
        out.push((itemset.clone(), support));

        let base = tree.prefix_paths(item);
        if base.is_empty() {
            continue;
        }
        let (conditional, cond_frequent) = build_tree(&base, min_count);
        if !cond_frequent.is_empty() {
            mine(&conditional, &cond_frequent, &itemset, min_count, out);
        }
    }
}

/// Mine all itemsets whose support meets `params.min_support`.
///
/// Duplicate items within a transaction count once. The result is sorted by
/// frequency descending, then by items.
pub fn frequent_itemsets(
    transactions: &[Vec<String>],
    params: &FpGrowthParams,
) -> Vec<FrequentItemset> {
    if transactions.is_empty() {
        return Vec::new();
    }
    let min_count = params.min_count(transactions.len());

    let mut ids: HashMap<&str, usize> = HashMap::new();
    let mut names: Vec<&str> = Vec::new();
    let encoded: Vec<(Vec<usize>, usize)> = transactions
        .iter()
        .map(|tx| {
            let unique: BTreeSet<&str> = tx.iter().map(String::as_str).collect();
            let items = unique
                .into_iter()
                .map(|name| {
                    *ids.entry(name).or_insert_with(|| {
                        names.push(name);
                        names.len() - 1
                    })
                })
                .collect();
            (items, 1)
        })
        .collect();

    let (tree, frequent) = build_tree(&encoded, min_count);
    let mut raw = Vec::new();
    mine(&tree, &frequent, &[], min_count, &mut raw);

    let mut itemsets: Vec<FrequentItemset> = raw
        .into_iter()
        .map(|(ids, frequency)| {
            let mut items: Vec<String> = ids.iter().map(|&i| names[i].to_string()).collect();
            items.sort();
            FrequentItemset { items, frequency }
        })
        .collect();
    itemsets.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.items.cmp(&b.items)));
    itemsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn set(items: &[&str], frequency: usize) -> FrequentItemset {
        FrequentItemset {
            items: tx(items),
            frequency,
        }
    }

    #[test]
    fn mines_pairs_above_half_support() {
        let transactions = vec![
            tx(&["milk", "bread"]),
            tx(&["milk", "bread", "eggs"]),
            tx(&["milk"]),
            tx(&["bread", "butter"]),
        ];
        let result = frequent_itemsets(&transactions, &FpGrowthParams::default());
        assert_eq!(
            result,
            vec![set(&["bread"], 3), set(&["milk"], 3), set(&["bread", "milk"], 2)]
        );
    }

    #[test]
    fn duplicates_within_transaction_count_once() {
        let transactions = vec![tx(&["a", "a", "b"]), tx(&["c"])];
        let result = frequent_itemsets(&transactions, &FpGrowthParams::default());
        assert_eq!(
            result,
            vec![set(&["a"], 1), set(&["a", "b"], 1), set(&["b"], 1), set(&["c"], 1)]
        );
    }

    #[test]
    fn finds_triples() {
        let transactions = vec![
            tx(&["x", "y", "z"]),
            tx(&["x", "y", "z"]),
            tx(&["x", "y"]),
            tx(&["w"]),
        ];
        let result = frequent_itemsets(&transactions, &FpGrowthParams::default());
        assert!(result.contains(&set(&["x", "y", "z"], 2)));
        assert!(result.contains(&set(&["x", "y"], 3)));
        assert!(!result.iter().any(|s| s.items == tx(&["w"])));
    }

    #[test]
    fn min_count_rounds_up() {
        let params = FpGrowthParams::default();
        assert_eq!(params.min_support, 0.5);
        assert_eq!(params.min_count(3), 2);
        assert_eq!(params.min_count(4), 2);
        assert_eq!(params.min_count(1), 1);
    }

    #[test]
    fn no_transactions_no_itemsets() {
        assert!(frequent_itemsets(&[], &FpGrowthParams::default()).is_empty());
    }
}
