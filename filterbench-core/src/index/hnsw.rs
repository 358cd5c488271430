//! Filtered HNSW (Hierarchical Navigable Small World) graph index.
//!
//! HNSW builds a multi-layer graph where:
//! - Layer 0 contains all vectors with dense connections
//! - Higher layers contain fewer vectors with sparser connections (like a skip list)
//! - Search starts at the top layer and greedily descends to layer 0
//!
//! # Predicate-aware search
//!
//! Layer 0 is built ACORN-style. Each node keeps up to `M * gamma`
//! candidates, which are then compressed: the `M_beta` closest are always
//! kept, and farther ones only if no kept neighbor already links to them.
//! At query time the beam only walks admissible nodes. When a direct
//! neighbor is filtered out, its own neighbors are tried instead, which
//! recovers the edges dropped by compression.
//!
//! # References
//!
//! - Malkov & Yashunin (2018): "Efficient and robust approximate nearest neighbor search using HNSW graphs"
//! - Patel et al. (2024): "ACORN: Performant and Predicate-Agnostic Search Over Vector Embeddings and Structured Data"

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::num::NonZeroUsize;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::distance::Metric;
use crate::error::{Error, Result};
use crate::filter::FilterBitmap;
use crate::index::{validate_search, AnnIndex, SearchOutput, DEFAULT_PADDING_ID};
use crate::vector::{NeighborId, VectorSet};

/// Build and search parameters for [`HnswIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Target degree. Upper layers keep at most `m` neighbors.
    /// Higher = better recall, more memory. Typical: 16-64.
    pub m: usize,
    /// Level-0 expansion factor; layer 0 keeps up to `m * gamma` candidates.
    pub gamma: usize,
    /// Number of closest level-0 neighbors kept uncompressed.
    pub m_beta: usize,
    /// Beam width during construction. Higher = better graph quality, slower build.
    pub ef_construction: usize,
    /// Beam width during search. Raised to `k` when smaller.
    pub ef_search: usize,
    pub metric: Metric,
    /// Seed for level assignment. The same seed and input yield the same graph.
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 32,
            gamma: 1,
            m_beta: 64,
            ef_construction: 40,
            ef_search: 16,
            metric: Metric::L2,
            seed: 42,
        }
    }
}

impl HnswParams {
    /// Parameters from the three ACORN knobs, everything else default.
    pub fn acorn(m: usize, gamma: usize, m_beta: usize) -> Self {
        Self {
            m,
            gamma,
            m_beta,
            ..Default::default()
        }
    }

    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Maximum list length at `layer`.
    #[inline]
    pub fn max_degree(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m * self.gamma
        } else {
            self.m
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(Error::InvalidConfig(format!("M must be at least 2, got {}", self.m)));
        }
        if self.gamma == 0 {
            return Err(Error::InvalidConfig("gamma must be positive".into()));
        }
        if self.ef_construction == 0 {
            return Err(Error::InvalidConfig("ef_construction must be positive".into()));
        }
        Ok(())
    }

    /// Level generation multiplier (1/ln(M)).
    fn ml(&self) -> f64 {
        1.0 / (self.m as f64).ln()
    }
}

/// A node in the graph. Its level is `neighbors.len() - 1`.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Node {
    /// neighbors[layer] = connected node ids, closest first at layer 0.
    pub(super) neighbors: Vec<Vec<u32>>,
}

impl Node {
    pub(super) fn new(level: usize) -> Self {
        Self {
            neighbors: vec![Vec::new(); level + 1],
        }
    }

    #[inline]
    pub(super) fn level(&self) -> usize {
        self.neighbors.len() - 1
    }
}

/// A candidate during search, ordered by distance (min-heap).
#[derive(Debug, Clone, Copy)]
struct Candidate {
    id: u32,
    distance: f32,
}

impl Candidate {
    fn order(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.order(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (lower distance = higher priority)
        other.order(self)
    }
}

/// A candidate for max-heap (furthest first).
#[derive(Debug, Clone, Copy)]
struct FurthestCandidate(Candidate);

impl PartialEq for FurthestCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for FurthestCandidate {}

impl PartialOrd for FurthestCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FurthestCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.order(&other.0)
    }
}

/// Filtered HNSW index over positional item ids.
///
/// # Example
///
/// ```
/// use filterbench_core::{AnnIndex, FilterBitmap, HnswIndex, HnswParams, VectorSet};
///
/// let vectors = VectorSet::from_rows(&[
///     [1.0f32, 0.0, 0.0],
///     [0.9, 0.1, 0.0],
///     [0.0, 1.0, 0.0],
/// ])
/// .unwrap();
/// let index = HnswIndex::build(&HnswParams::acorn(4, 1, 4), &vectors, &[0; 3]).unwrap();
///
/// let queries = VectorSet::from_rows(&[[1.0f32, 0.0, 0.0]]).unwrap();
/// let mut bitmap = FilterBitmap::all_admissible(1, 3);
/// bitmap.set(0, 0, false);
///
/// let out = index.search(&queries, 1, &bitmap).unwrap();
/// assert_eq!(out.ids(0), &[1]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HnswIndex {
    pub(super) params: HnswParams,
    pub(super) vectors: VectorSet,
    pub(super) metadata: Vec<i32>,
    pub(super) nodes: Vec<Node>,
    /// Entry point (node with highest level).
    pub(super) entry_point: Option<u32>,
    /// Current maximum level in the graph.
    pub(super) max_level: usize,
}

impl HnswIndex {
    #[inline]
    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    #[inline]
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    #[inline]
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Opaque per-item metadata supplied at build time.
    pub fn metadata(&self) -> &[i32] {
        &self.metadata
    }

    /// The indexed vectors.
    pub fn vectors(&self) -> &VectorSet {
        &self.vectors
    }

    /// Neighbor list of `id` at `layer`; empty if the node does not reach that layer.
    pub fn neighbors(&self, id: u32, layer: usize) -> &[u32] {
        self.nodes
            .get(id as usize)
            .and_then(|n| n.neighbors.get(layer))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Computes distance between query and a node.
    #[inline]
    fn distance(&self, query: &[f32], id: u32) -> f32 {
        self.params.metric.compute(query, self.vectors.row(id as usize))
    }

    fn random_level(rng: &mut StdRng, ml: f64) -> usize {
        // (0, 1], so ln never sees zero
        let r: f64 = 1.0 - rng.gen::<f64>();
        (-r.ln() * ml).floor() as usize
    }

    /// Links node `id` into the graph. Nodes must be inserted in id order.
    fn insert(&mut self, id: u32, level: usize) {
        self.nodes.push(Node::new(level));

        // First node - make it the entry point
        let Some(entry_point) = self.entry_point else {
            self.entry_point = Some(id);
            self.max_level = level;
            return;
        };

        let query = self.vectors.row(id as usize).to_vec();

        // Phase 1: Greedily traverse from top to new node's level + 1
        let mut current_ep = entry_point;
        for layer in (level + 1..=self.max_level).rev() {
            current_ep = self.greedy_closest(&query, current_ep, layer);
        }

        // Phase 2: Search and connect at each layer from level down to 0
        let mut ep_set = vec![current_ep];
        for layer in (0..=level.min(self.max_level)).rev() {
            let candidates =
                self.search_layer(&query, &ep_set, self.params.ef_construction, layer, None);
            let max_degree = self.params.max_degree(layer);
            let neighbors = select_closest(&candidates, max_degree);

            self.nodes[id as usize].neighbors[layer] = neighbors.clone();

            // Connect neighbors back to new node (bidirectional)
            for &neighbor in &neighbors {
                self.nodes[neighbor as usize].neighbors[layer].push(id);
                if self.nodes[neighbor as usize].neighbors[layer].len() > max_degree {
                    self.prune(neighbor, layer, max_degree);
                }
            }

            ep_set = candidates.iter().map(|c| c.id).collect();
        }

        if level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }
    }

    /// Keeps the `max_degree` closest neighbors of `id` at `layer`.
    fn prune(&mut self, id: u32, layer: usize, max_degree: usize) {
        let scored = self.scored_neighbors(id, layer);
        self.nodes[id as usize].neighbors[layer] = select_closest(&scored, max_degree);
    }

    /// Neighbors of `id` at `layer` with their distance to `id`, closest first.
    fn scored_neighbors(&self, id: u32, layer: usize) -> Vec<Candidate> {
        let base = self.vectors.row(id as usize);
        let mut scored: Vec<Candidate> = self.nodes[id as usize].neighbors[layer]
            .iter()
            .map(|&n| Candidate {
                id: n,
                distance: self.distance(base, n),
            })
            .collect();
        scored.sort_by(Candidate::order);
        scored
    }

    /// Compresses every level-0 list. The first `m_beta` entries are kept;
    /// a later entry is kept only if no kept entry already links to it.
    fn compress_level0(&mut self) {
        let m_beta = self.params.m_beta;
        let compressed: Vec<Vec<u32>> = (0..self.nodes.len() as u32)
            .map(|id| {
                let sorted = self.scored_neighbors(id, 0);
                let mut kept = Vec::with_capacity(sorted.len());
                let mut covered: HashSet<u32> = HashSet::new();
                for (rank, candidate) in sorted.iter().enumerate() {
                    if rank < m_beta || !covered.contains(&candidate.id) {
                        kept.push(candidate.id);
                        covered.insert(candidate.id);
                        covered.extend(self.nodes[candidate.id as usize].neighbors[0].iter().copied());
                    }
                }
                kept
            })
            .collect();

        for (node, list) in self.nodes.iter_mut().zip(compressed) {
            node.neighbors[0] = list;
        }
    }

    /// Greedy search for a single nearest neighbor at a layer.
    fn greedy_closest(&self, query: &[f32], entry: u32, layer: usize) -> u32 {
        let mut current = entry;
        let mut current_dist = self.distance(query, current);

        loop {
            let mut changed = false;
            for &neighbor in self.neighbors(current, layer) {
                let dist = self.distance(query, neighbor);
                if dist < current_dist {
                    current = neighbor;
                    current_dist = dist;
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        current
    }

    /// Ids reachable from `id` at `layer` under the filter.
    ///
    /// Unfiltered, this is the plain neighbor list. Filtered, admissible
    /// neighbors are taken directly and a filtered-out neighbor contributes
    /// its own admissible neighbors, up to `m` ids in total.
    fn expand(&self, id: u32, layer: usize, admissible: Option<&[bool]>, out: &mut Vec<u32>) {
        out.clear();
        let list = self.neighbors(id, layer);
        let Some(admissible) = admissible else {
            out.extend_from_slice(list);
            return;
        };

        let budget = self.params.m;
        for &neighbor in list {
            if out.len() >= budget {
                break;
            }
            if admissible[neighbor as usize] {
                if !out.contains(&neighbor) {
                    out.push(neighbor);
                }
                continue;
            }
            for &hop in self.neighbors(neighbor, layer) {
                if out.len() >= budget {
                    break;
                }
                if hop != id && admissible[hop as usize] && !out.contains(&hop) {
                    out.push(hop);
                }
            }
        }
    }

    /// Beam search of width `ef` at one layer, closest first.
    ///
    /// With a filter, inadmissible entry points may seed the beam but
    /// never appear in the results.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[u32],
        ef: usize,
        layer: usize,
        admissible: Option<&[bool]>,
    ) -> Vec<Candidate> {
        let is_admissible = |id: u32| admissible.map_or(true, |a| a[id as usize]);

        let mut visited: HashSet<u32> = HashSet::new();
        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();
        let mut results: BinaryHeap<FurthestCandidate> = BinaryHeap::new();

        for &ep in entry_points {
            if visited.insert(ep) {
                let candidate = Candidate {
                    id: ep,
                    distance: self.distance(query, ep),
                };
                candidates.push(candidate);
                if is_admissible(ep) {
                    results.push(FurthestCandidate(candidate));
                }
            }
        }
        while results.len() > ef {
            results.pop();
        }

        let mut expanded = Vec::new();
        while let Some(closest) = candidates.pop() {
            // Stop if closest candidate is further than worst result
            if let Some(furthest) = results.peek() {
                if results.len() >= ef && closest.distance > furthest.0.distance {
                    break;
                }
            }

            self.expand(closest.id, layer, admissible, &mut expanded);
            for &neighbor in &expanded {
                if !visited.insert(neighbor) {
                    continue;
                }
                let dist = self.distance(query, neighbor);
                let should_add = results.len() < ef
                    || dist < results.peek().map(|f| f.0.distance).unwrap_or(f32::MAX);

                if should_add {
                    let candidate = Candidate {
                        id: neighbor,
                        distance: dist,
                    };
                    candidates.push(candidate);
                    if is_admissible(neighbor) {
                        results.push(FurthestCandidate(candidate));
                        // Keep only ef best
                        while results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        let mut found: Vec<Candidate> = results.into_iter().map(|f| f.0).collect();
        found.sort_by(Candidate::order);
        found
    }

    /// Top-`k` admissible hits for one query.
    fn search_one(
        &self,
        query: &[f32],
        k: usize,
        ef: usize,
        admissible: &[bool],
    ) -> Vec<(NeighborId, f32)> {
        let Some(entry_point) = self.entry_point else {
            return Vec::new();
        };

        // Phase 1: Greedy descent (without filtering - need to navigate the graph)
        let mut current_ep = entry_point;
        for layer in (1..=self.max_level).rev() {
            current_ep = self.greedy_closest(query, current_ep, layer);
        }

        // Phase 2: Filtered beam search at layer 0
        self.search_layer(query, &[current_ep], ef, 0, Some(admissible))
            .into_iter()
            .take(k)
            .map(|c| (c.id as NeighborId, c.distance))
            .collect()
    }
}

/// Ids of the `m` closest candidates.
fn select_closest(candidates: &[Candidate], m: usize) -> Vec<u32> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by(Candidate::order);
    sorted.iter().take(m).map(|c| c.id).collect()
}

impl AnnIndex for HnswIndex {
    type Params = HnswParams;

    fn build(params: &HnswParams, vectors: &VectorSet, metadata: &[i32]) -> Result<Self> {
        params.validate()?;
        if metadata.len() != vectors.len() {
            return Err(Error::CountMismatch {
                what: "metadata vs vectors",
                left: metadata.len(),
                right: vectors.len(),
            });
        }
        let n = u32::try_from(vectors.len()).map_err(|_| {
            Error::InvalidConfig(format!("{} vectors exceed the u32 id space", vectors.len()))
        })?;

        let mut index = Self {
            params: params.clone(),
            vectors: vectors.clone(),
            metadata: metadata.to_vec(),
            nodes: Vec::with_capacity(n as usize),
            entry_point: None,
            max_level: 0,
        };

        let mut rng = StdRng::seed_from_u64(params.seed);
        let ml = params.ml();
        for id in 0..n {
            let level = Self::random_level(&mut rng, ml);
            index.insert(id, level);
        }
        index.compress_level0();

        debug!(
            items = n,
            max_level = index.max_level,
            m = params.m,
            gamma = params.gamma,
            m_beta = params.m_beta,
            "hnsw graph built"
        );
        Ok(index)
    }

    fn configure_search(&mut self, ef_search: usize) {
        self.params.ef_search = ef_search;
    }

    /// Searches all queries, spread over the machine's available parallelism.
    fn search(&self, queries: &VectorSet, k: usize, bitmap: &FilterBitmap) -> Result<SearchOutput> {
        validate_search(self, queries, bitmap)?;

        let n_queries = queries.len();
        let mut output = SearchOutput::padded(n_queries, k, DEFAULT_PADDING_ID);
        if k == 0 || n_queries == 0 || self.is_empty() {
            return Ok(output);
        }

        let ef = self.params.ef_search.max(k);
        let workers = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            .min(n_queries);
        let per_worker = n_queries.div_ceil(workers);

        let (ids, distances) = output.buffers_mut();
        thread::scope(|scope| {
            let id_chunks = ids.chunks_mut(per_worker * k);
            let dist_chunks = distances.chunks_mut(per_worker * k);
            for (chunk, (id_chunk, dist_chunk)) in id_chunks.zip(dist_chunks).enumerate() {
                scope.spawn(move || {
                    let rows = id_chunk.chunks_mut(k).zip(dist_chunk.chunks_mut(k));
                    for (offset, (id_row, dist_row)) in rows.enumerate() {
                        let q = chunk * per_worker + offset;
                        let hits = self.search_one(queries.row(q), k, ef, bitmap.row(q));
                        for (slot, (id, dist)) in hits.into_iter().enumerate() {
                            id_row[slot] = id;
                            dist_row[slot] = dist;
                        }
                    }
                });
            }
        });

        Ok(output)
    }

    fn padding_id(&self) -> Option<NeighborId> {
        Some(DEFAULT_PADDING_ID)
    }

    #[inline]
    fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.vectors.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FlatIndex, FlatParams};

    fn random_vectors(n: usize, dim: usize, seed: u64) -> VectorSet {
        let mut rng = StdRng::seed_from_u64(seed);
        let data: Vec<f32> = (0..n * dim).map(|_| rng.gen::<f32>()).collect();
        VectorSet::from_flat(dim, data).unwrap()
    }

    fn create_test_index() -> HnswIndex {
        let vectors = VectorSet::from_rows(&[
            [1.0f32, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0],
            [1.0, 0.0, 1.0],
        ])
        .unwrap();
        HnswIndex::build(&HnswParams::acorn(4, 1, 4), &vectors, &[0; 5]).unwrap()
    }

    /// Recall@k of the graph search against exact search, pooled over all queries.
    fn recall_against_exact(
        index: &HnswIndex,
        queries: &VectorSet,
        k: usize,
        bitmap: &FilterBitmap,
    ) -> f64 {
        let exact = FlatIndex::build(&FlatParams::default(), index.vectors(), index.metadata())
            .unwrap()
            .search(queries, k, bitmap)
            .unwrap();
        let approx = index.search(queries, k, bitmap).unwrap();

        let mut hits = 0;
        let mut total = 0;
        for q in 0..queries.len() {
            let truth: HashSet<_> = exact.ids(q).iter().filter(|&&id| id >= 0).collect();
            total += truth.len();
            hits += approx.ids(q).iter().filter(|id| truth.contains(id)).count();
        }
        hits as f64 / total as f64
    }

    #[test]
    fn test_params_validation() {
        assert!(HnswParams::default().validate().is_ok());
        assert!(HnswParams::acorn(1, 1, 1).validate().is_err());
        assert!(HnswParams::acorn(8, 0, 1).validate().is_err());
        assert!(HnswParams::default()
            .with_ef_construction(0)
            .validate()
            .is_err());
        assert_eq!(HnswParams::acorn(8, 3, 16).max_degree(0), 24);
        assert_eq!(HnswParams::acorn(8, 3, 16).max_degree(2), 8);
    }

    #[test]
    fn test_build_small() {
        let index = create_test_index();
        assert_eq!(index.len(), 5);
        assert_eq!(index.dimension(), 3);
        assert!(index.entry_point().is_some());
    }

    #[test]
    fn test_build_single_and_empty() {
        let one = VectorSet::from_rows(&[[1.0f32, 2.0]]).unwrap();
        let index = HnswIndex::build(&HnswParams::default(), &one, &[7]).unwrap();
        assert_eq!(index.entry_point(), Some(0));
        assert_eq!(index.metadata(), &[7]);

        let empty = HnswIndex::build(&HnswParams::default(), &VectorSet::new(2), &[]).unwrap();
        assert!(empty.is_empty());
        let queries = VectorSet::from_rows(&[[0.0f32, 0.0]]).unwrap();
        let out = empty
            .search(&queries, 2, &FilterBitmap::all_admissible(1, 0))
            .unwrap();
        assert_eq!(out.ids(0), &[-1, -1]);
    }

    #[test]
    fn test_build_rejects_bad_metadata() {
        let vectors = random_vectors(4, 2, 1);
        let result = HnswIndex::build(&HnswParams::default(), &vectors, &[0; 3]);
        assert!(matches!(result, Err(Error::CountMismatch { .. })));
    }

    #[test]
    fn test_search_exact_match() {
        let index = create_test_index();
        let queries = VectorSet::from_rows(&[[1.0f32, 0.0, 0.0]]).unwrap();
        let out = index
            .search(&queries, 1, &FilterBitmap::all_admissible(1, 5))
            .unwrap();
        assert_eq!(out.ids(0), &[0]);
        assert!(out.distances(0)[0] < 1e-6);
    }

    #[test]
    fn test_results_sorted_and_unique() {
        let index = create_test_index();
        let queries = VectorSet::from_rows(&[[0.5f32, 0.5, 0.5]]).unwrap();
        let out = index
            .search(&queries, 5, &FilterBitmap::all_admissible(1, 5))
            .unwrap();

        let distances = out.distances(0);
        for i in 1..distances.len() {
            assert!(distances[i - 1] <= distances[i]);
        }
        let unique: HashSet<_> = out.ids(0).iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_degree_bounds() {
        let params = HnswParams::acorn(4, 2, 3).with_ef_construction(32);
        let vectors = random_vectors(200, 8, 7);
        let index = HnswIndex::build(&params, &vectors, &[0; 200]).unwrap();

        for id in 0..200u32 {
            assert!(index.neighbors(id, 0).len() <= params.max_degree(0));
            assert!(!index.neighbors(id, 0).contains(&id));
            for layer in 1..=index.max_level() {
                assert!(index.neighbors(id, layer).len() <= params.max_degree(layer));
            }
        }
    }

    #[test]
    fn test_compression_keeps_m_beta_closest() {
        let params = HnswParams::acorn(6, 2, 2).with_ef_construction(32);
        let vectors = random_vectors(120, 4, 11);
        let index = HnswIndex::build(&params, &vectors, &[0; 120]).unwrap();

        for id in 0..120u32 {
            let list = index.neighbors(id, 0);
            let scored: Vec<f32> = list
                .iter()
                .map(|&n| index.distance(vectors.row(id as usize), n))
                .collect();
            // closest first
            for pair in scored.windows(2) {
                assert!(pair[0] <= pair[1]);
            }
            // entries past m_beta are not reachable from an earlier kept entry
            for (rank, &n) in list.iter().enumerate().skip(params.m_beta) {
                assert!(list[..rank]
                    .iter()
                    .all(|&kept| !index.neighbors(kept, 0).contains(&n)));
            }
        }
    }

    #[test]
    fn test_same_seed_same_graph() {
        let vectors = random_vectors(100, 4, 3);
        let params = HnswParams::acorn(8, 1, 8).with_seed(99);
        let a = HnswIndex::build(&params, &vectors, &[0; 100]).unwrap();
        let b = HnswIndex::build(&params, &vectors, &[0; 100]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_filtered_results_are_admissible() {
        let vectors = random_vectors(300, 8, 5);
        let index = HnswIndex::build(
            &HnswParams::acorn(16, 1, 16).with_ef_search(64),
            &vectors,
            &[0; 300],
        )
        .unwrap();
        let queries = random_vectors(20, 8, 6);
        let bitmap = FilterBitmap::from_fn(20, 300, |q, i| (i + q) % 7 == 0);

        let out = index.search(&queries, 10, &bitmap).unwrap();
        for q in 0..20 {
            for &id in out.ids(q) {
                assert!(id == -1 || bitmap.get(q, id as usize));
            }
        }
    }

    #[test]
    fn test_too_few_admissible_is_padded() {
        let index = create_test_index();
        let queries = VectorSet::from_rows(&[[1.0f32, 0.0, 0.0]]).unwrap();
        let mut bitmap = FilterBitmap::new(1, 5);
        bitmap.set(0, 3, true);

        let out = index.search(&queries, 3, &bitmap).unwrap();
        assert_eq!(out.ids(0)[0], 3);
        assert_eq!(&out.ids(0)[1..], &[-1, -1]);
    }

    #[test]
    fn test_recall_vs_exact_unfiltered() {
        let vectors = random_vectors(500, 8, 21);
        let index = HnswIndex::build(
            &HnswParams::acorn(16, 1, 32)
                .with_ef_construction(100)
                .with_ef_search(100),
            &vectors,
            &[0; 500],
        )
        .unwrap();
        let queries = random_vectors(25, 8, 22);
        let bitmap = FilterBitmap::all_admissible(25, 500);

        let recall = recall_against_exact(&index, &queries, 10, &bitmap);
        assert!(recall >= 0.8, "recall {:.3} below 0.8", recall);
    }

    #[test]
    fn test_recall_vs_exact_half_filtered() {
        let vectors = random_vectors(500, 8, 31);
        let index = HnswIndex::build(
            &HnswParams::acorn(16, 2, 16)
                .with_ef_construction(100)
                .with_ef_search(100),
            &vectors,
            &[0; 500],
        )
        .unwrap();
        let queries = random_vectors(25, 8, 32);
        let bitmap = FilterBitmap::from_fn(25, 500, |q, i| i % 2 == q % 2);

        let recall = recall_against_exact(&index, &queries, 10, &bitmap);
        assert!(recall >= 0.7, "recall {:.3} below 0.7", recall);
    }

    #[test]
    fn test_configure_search() {
        let mut index = create_test_index();
        index.configure_search(123);
        assert_eq!(index.params().ef_search, 123);
    }
}
