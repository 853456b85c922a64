use std::collections::BTreeMap;

use crate::graph::GraphError;

/// Disjoint-set forest over dense node positions, with path compression and
/// union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(nb_nodes: usize) -> Self {
        Self {
            parent: (0..nb_nodes).collect(),
            rank: vec![0; nb_nodes],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x == root_y {
            return;
        }

        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }
}

/// Turns accepted edges into disjoint groupings of node positions.
///
/// Every node lands in exactly one grouping; nodes without accepted edges become
/// singletons. Groupings are ordered by their smallest member and their members
/// are ascending, so the output only depends on the edge set.
pub fn groupings_from_edges<I>(nb_nodes: usize, edges: I) -> Result<Vec<Vec<usize>>, GraphError>
where
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut forest = UnionFind::new(nb_nodes);

    for (edge, (from, to)) in edges.into_iter().enumerate() {
        for node in [from, to] {
            if node >= nb_nodes {
                return Err(GraphError::NodeOutOfRange {
                    edge,
                    node,
                    nb_nodes,
                });
            }
        }
        forest.union(from, to);
    }

    // keyed by smallest member; nodes are visited in ascending order
    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut first_of_root: Vec<Option<usize>> = vec![None; nb_nodes];

    for node in 0..nb_nodes {
        let root = forest.find(node);
        let first = *first_of_root[root].get_or_insert(node);
        components.entry(first).or_default().push(node);
    }

    Ok(components.into_values().collect())
}
