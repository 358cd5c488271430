//! Benchmark driver: loads inputs, times filter construction and search,
//! scores recall, and assembles reports.
//!
//! A query run moves strictly through
//! `Loading → ConstructingFilter → Searching → Scoring → Reporting → Done`;
//! a construction run through `Loading → Building → Reporting → Done`.
//! Any error aborts the run in whatever phase it occurs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tracing::info;

use crate::codec::{load_item_attributes, load_query_attributes, read_fvecs, read_ivecs};
use crate::error::{Error, Result};
use crate::filter::{build_bitmap, FilterType};
use crate::index::{AnnIndex, HnswIndex, HnswParams};
use crate::probe::{MemoryReport, ThreadMonitor, ThreadStats, DEFAULT_SAMPLE_INTERVAL};
use crate::recall::{self, truncate_groundtruth, RecallReport};
use crate::vector::{NeighborId, VectorSet};

/// Stage of a benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Loading,
    ConstructingFilter,
    Searching,
    Scoring,
    Building,
    Reporting,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Loading => "loading",
            Phase::ConstructingFilter => "constructing-filter",
            Phase::Searching => "searching",
            Phase::Scoring => "scoring",
            Phase::Building => "building",
            Phase::Reporting => "reporting",
            Phase::Done => "done",
        })
    }
}

/// Logs each phase transition with the time spent in the phase it leaves.
struct PhaseLog {
    current: Phase,
    entered: Instant,
}

impl PhaseLog {
    fn start() -> Self {
        info!(phase = %Phase::Loading, "run started");
        Self {
            current: Phase::Loading,
            entered: Instant::now(),
        }
    }

    fn advance(&mut self, next: Phase) {
        info!(
            from = %self.current,
            to = %next,
            elapsed_ms = self.entered.elapsed().as_millis() as u64,
            "phase transition"
        );
        self.current = next;
        self.entered = Instant::now();
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Queries answered over a wall-clock interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub queries: usize,
    pub elapsed: Duration,
}

impl Throughput {
    pub fn new(queries: usize, elapsed: Duration) -> Self {
        Self { queries, elapsed }
    }

    /// Queries per second, or `None` when no time elapsed.
    pub fn qps(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            Some(self.queries as f64 / secs)
        } else {
            None
        }
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.qps() {
            Some(qps) => write!(f, "{:.3}", qps),
            None => f.write_str("undefined (zero elapsed time)"),
        }
    }
}

impl Serialize for Throughput {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr {
            queries: usize,
            elapsed_secs: f64,
            qps: Option<f64>,
        }
        Repr {
            queries: self.queries,
            elapsed_secs: self.elapsed.as_secs_f64(),
            qps: self.qps(),
        }
        .serialize(serializer)
    }
}

/// Inputs and knobs of a query run. The index itself is passed to
/// [`QueryBenchmark::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    pub item_attributes: PathBuf,
    pub query_vectors: PathBuf,
    pub query_attributes: PathBuf,
    pub groundtruth: PathBuf,
    pub filter_type: FilterType,
    pub k: usize,
    pub ef_search: usize,
    /// Overrides the index's own padding id when set.
    pub padding_id: Option<NeighborId>,
    pub sample_interval: Duration,
}

impl QueryConfig {
    pub fn new(
        item_attributes: impl Into<PathBuf>,
        query_vectors: impl Into<PathBuf>,
        query_attributes: impl Into<PathBuf>,
        groundtruth: impl Into<PathBuf>,
        filter_type: FilterType,
    ) -> Self {
        Self {
            item_attributes: item_attributes.into(),
            query_vectors: query_vectors.into(),
            query_attributes: query_attributes.into(),
            groundtruth: groundtruth.into(),
            filter_type,
            k: 10,
            ef_search: 16,
            padding_id: None,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }

    pub fn with_padding_id(mut self, padding_id: NeighborId) -> Self {
        self.padding_id = Some(padding_id);
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }
}

/// Inputs and knobs of a construction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionConfig {
    pub database_vectors: PathBuf,
    pub index_output: PathBuf,
    pub params: HnswParams,
    pub sample_interval: Duration,
}

impl ConstructionConfig {
    pub fn new(database_vectors: impl Into<PathBuf>, index_output: impl Into<PathBuf>) -> Self {
        Self {
            database_vectors: database_vectors.into(),
            index_output: index_output.into(),
            params: HnswParams::default(),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    pub fn with_params(mut self, params: HnswParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }
}

/// Outcome of a query run.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub filter_type: FilterType,
    pub k: usize,
    pub ef_search: usize,
    pub n_queries: usize,
    pub n_items: usize,
    /// Fraction of admissible (query, item) pairs.
    pub selectivity: f64,
    #[serde(serialize_with = "serialize_secs")]
    pub filter_time: Duration,
    /// Filter construction start to search end.
    pub with_filtering: Throughput,
    /// Search start to search end.
    pub without_filtering: Throughput,
    pub recall: f64,
    pub recall_counts: RecallReport,
    pub threads: ThreadStats,
    pub memory: MemoryReport,
}

impl fmt::Display for QueryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Maximum number of threads: {}",
            self.threads.peak_excluding_monitor
        )?;
        writeln!(f, "{}", self.memory)?;
        writeln!(
            f,
            "Queries per second (without filtering): {}",
            self.without_filtering
        )?;
        writeln!(f, "Queries per second: {}", self.with_filtering)?;
        write!(f, "Recall: {:.3}", self.recall)
    }
}

/// Outcome of a construction run.
#[derive(Debug, Clone, Serialize)]
pub struct ConstructionReport {
    pub n_items: usize,
    pub dimension: usize,
    #[serde(serialize_with = "serialize_secs")]
    pub build_time: Duration,
    pub threads: ThreadStats,
    pub memory: MemoryReport,
}

impl fmt::Display for ConstructionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Maximum number of threads: {}",
            self.threads.peak_excluding_monitor
        )?;
        writeln!(
            f,
            "Index construction time: {:.3} s",
            self.build_time.as_secs_f64()
        )?;
        write!(f, "{}", self.memory)
    }
}

/// Reads a mandatory vector file. The codec is lenient, so emptiness is
/// the only failure signal left.
fn load_vectors(path: &Path) -> Result<VectorSet> {
    let vectors = read_fvecs(path);
    if vectors.is_empty() {
        return Err(Error::EmptyInput(path.to_path_buf()));
    }
    Ok(vectors)
}

fn ensure_counts(what: &'static str, left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(Error::CountMismatch { what, left, right });
    }
    Ok(())
}

/// Filtered query benchmark over any [`AnnIndex`].
pub struct QueryBenchmark;

impl QueryBenchmark {
    /// Runs the queries in `config` against `index`.
    ///
    /// The search breadth is applied to the index before searching. The
    /// padding id used for scoring is `config.padding_id`, falling back to
    /// the index's own.
    pub fn run<I: AnnIndex>(config: &QueryConfig, index: &mut I) -> Result<QueryReport> {
        if config.k == 0 {
            return Err(Error::InvalidConfig("k must be positive".into()));
        }
        let mut phases = PhaseLog::start();

        let queries = load_vectors(&config.query_vectors)?;
        let groundtruth = read_ivecs(&config.groundtruth);
        if groundtruth.is_empty() {
            return Err(Error::EmptyInput(config.groundtruth.clone()));
        }
        let groundtruth = truncate_groundtruth(groundtruth, config.k);
        ensure_counts("query vectors vs ground truth", queries.len(), groundtruth.len())?;
        if queries.dimension() != index.dimension() {
            return Err(Error::DimensionMismatch {
                expected: index.dimension(),
                got: queries.dimension(),
            });
        }

        let items = load_item_attributes(config.filter_type, &config.item_attributes)?;
        let query_attributes = load_query_attributes(config.filter_type, &config.query_attributes)?;
        ensure_counts("query vectors vs query attributes", queries.len(), query_attributes.len())?;
        ensure_counts("item attributes vs indexed items", items.len(), index.len())?;

        index.configure_search(config.ef_search);
        let padding = config.padding_id.or_else(|| index.padding_id());
        info!(
            queries = queries.len(),
            items = index.len(),
            filter_type = %config.filter_type,
            k = config.k,
            ef_search = config.ef_search,
            padding = ?padding,
            "inputs loaded"
        );

        let monitor = ThreadMonitor::start_with_interval(config.sample_interval);

        phases.advance(Phase::ConstructingFilter);
        let filter_start = Instant::now();
        let bitmap = build_bitmap(&items, &query_attributes)?;
        let search_start = Instant::now();

        phases.advance(Phase::Searching);
        let output = index.search(&queries, config.k, &bitmap)?;
        let search_end = Instant::now();
        let threads = monitor.stop();

        phases.advance(Phase::Scoring);
        let recall_counts = recall::score(&groundtruth, &output, config.k, padding)?;

        phases.advance(Phase::Reporting);
        let n_queries = queries.len();
        let report = QueryReport {
            filter_type: config.filter_type,
            k: config.k,
            ef_search: config.ef_search,
            n_queries,
            n_items: index.len(),
            selectivity: bitmap.selectivity(),
            filter_time: search_start - filter_start,
            with_filtering: Throughput::new(n_queries, search_end - filter_start),
            without_filtering: Throughput::new(n_queries, search_end - search_start),
            recall: recall_counts.recall(),
            recall_counts,
            threads,
            memory: MemoryReport::capture(),
        };

        phases.advance(Phase::Done);
        Ok(report)
    }
}

/// Index construction benchmark.
pub struct ConstructionBenchmark;

impl ConstructionBenchmark {
    /// Builds an [`HnswIndex`] from `config`, then saves it.
    pub fn run(config: &ConstructionConfig) -> Result<ConstructionReport> {
        let mut phases = PhaseLog::start();
        let vectors = load_vectors(&config.database_vectors)?;

        let (index, report) =
            Self::build::<HnswIndex>(&mut phases, &vectors, &config.params, config.sample_interval)?;

        index.save(&config.index_output)?;
        phases.advance(Phase::Done);
        Ok(report)
    }

    /// Times the build of any engine over already loaded vectors. Metadata is all zeros.
    fn build<I: AnnIndex>(
        phases: &mut PhaseLog,
        vectors: &VectorSet,
        params: &I::Params,
        sample_interval: Duration,
    ) -> Result<(I, ConstructionReport)> {
        let metadata = vec![0; vectors.len()];
        let monitor = ThreadMonitor::start_with_interval(sample_interval);

        phases.advance(Phase::Building);
        let start = Instant::now();
        let index = I::build(params, vectors, &metadata)?;
        let build_time = start.elapsed();
        let threads = monitor.stop();

        phases.advance(Phase::Reporting);
        let report = ConstructionReport {
            n_items: index.len(),
            dimension: index.dimension(),
            build_time,
            threads,
            memory: MemoryReport::capture(),
        };
        Ok((index, report))
    }
}
