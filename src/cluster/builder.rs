use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::constants::UNCLUSTERED;

/// Page-local mapping from line identifier to cluster id.
///
/// Lines that no grouping mentions are absent; [`ClusterAssignment::cluster_of`]
/// reports them as [`UNCLUSTERED`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment<T: Eq + Hash> {
    clusters: HashMap<T, i64>,
    nb_groupings: usize,
}

impl<T: Eq + Hash> Default for ClusterAssignment<T> {
    fn default() -> Self {
        Self {
            clusters: HashMap::new(),
            nb_groupings: 0,
        }
    }
}

impl<T: Eq + Hash> ClusterAssignment<T> {
    /// Cluster id of `line`, if any grouping mentioned it.
    pub fn get<Q>(&self, line: &Q) -> Option<i64>
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.clusters.get(line).copied()
    }

    /// Cluster id of `line`, or [`UNCLUSTERED`] when it is absent.
    pub fn cluster_of<Q>(&self, line: &Q) -> i64
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.get(line).unwrap_or(UNCLUSTERED)
    }

    pub fn contains<Q>(&self, line: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.clusters.contains_key(line)
    }

    /// Number of assigned lines.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Number of groupings seen, i.e. the next id that would be handed out.
    ///
    /// A grouping whose lines were all claimed by later groupings still
    /// consumes an id.
    pub fn nb_groupings(&self) -> usize {
        self.nb_groupings
    }

    /// Labels for `universe`, in order, with [`UNCLUSTERED`] for unknown lines.
    pub fn labels_for<'a, Q, I>(&self, universe: I) -> Vec<i64>
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        universe
            .into_iter()
            .map(|line| self.cluster_of(line))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, i64)> {
        self.clusters.iter().map(|(line, &id)| (line, id))
    }
}

/// Assigns every grouping a fresh id in sequence order (0, 1, 2, ...).
///
/// A line mentioned by several groupings ends up with the id of the last one.
pub fn build_clusters<T, G>(groupings: &[G]) -> ClusterAssignment<T>
where
    T: Eq + Hash + Clone,
    G: AsRef<[T]>,
{
    let mut clusters = HashMap::new();

    for (cluster_id, grouping) in groupings.iter().enumerate() {
        for line in grouping.as_ref() {
            clusters.insert(line.clone(), cluster_id as i64);
        }
    }

    ClusterAssignment {
        clusters,
        nb_groupings: groupings.len(),
    }
}
