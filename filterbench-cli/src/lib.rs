//! Shared glue for the `build-index` and `query-index` binaries: argument
//! definitions, logging setup, and report output.

use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use filterbench_core::{ConstructionConfig, FilterType, HnswParams, NeighborId, QueryConfig};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Build an ACORN-style HNSW index over a `.fvecs` file and save it.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "build-index")]
pub struct BuildArgs {
    /// Database vectors (`.fvecs`)
    pub database_vectors: PathBuf,
    /// Where to write the index
    pub index_output: PathBuf,
    /// Upper-layer degree
    #[arg(value_name = "M")]
    pub m: usize,
    /// Level-0 expansion factor; layer 0 keeps up to M * gamma neighbors
    pub gamma: usize,
    /// Level-0 neighbors kept unconditionally during compression
    #[arg(value_name = "M_BETA")]
    pub m_beta: usize,
    #[arg(long, default_value_t = HnswParams::default().ef_construction)]
    pub ef_construction: usize,
    /// Seed for level assignment
    #[arg(long, default_value_t = HnswParams::default().seed)]
    pub seed: u64,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl BuildArgs {
    pub fn config(&self) -> ConstructionConfig {
        let params = HnswParams::acorn(self.m, self.gamma, self.m_beta)
            .with_ef_construction(self.ef_construction)
            .with_seed(self.seed);
        ConstructionConfig::new(&self.database_vectors, &self.index_output).with_params(params)
    }
}

/// Run filtered queries against a saved index and report throughput and recall.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "query-index")]
pub struct QueryArgs {
    /// Per-item attributes, one record per line
    pub database_attributes: PathBuf,
    /// Query vectors (`.fvecs`)
    pub query_vectors: PathBuf,
    /// Per-query attributes, one record per line
    pub query_attributes: PathBuf,
    /// Ground-truth neighbor ids (`.ivecs`)
    pub groundtruth: PathBuf,
    /// Index written by build-index
    pub index: PathBuf,
    /// One of EM, R, EMIS, EM_R
    pub filter_type: String,
    pub k: usize,
    pub ef_search: usize,
    /// Id the engine uses for unfilled result slots
    #[arg(long, allow_hyphen_values = true)]
    pub padding_id: Option<NeighborId>,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryArgs {
    pub fn config(&self) -> filterbench_core::Result<QueryConfig> {
        let filter_type: FilterType = self.filter_type.parse()?;
        let mut config = QueryConfig::new(
            &self.database_attributes,
            &self.query_vectors,
            &self.query_attributes,
            &self.groundtruth,
            filter_type,
        )
        .with_k(self.k)
        .with_ef_search(self.ef_search);
        if let Some(padding_id) = self.padding_id {
            config = config.with_padding_id(padding_id);
        }
        Ok(config)
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the `warn` default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parses the command line, exiting with status 1 on a usage error.
pub fn parse_args<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // --help and --version are not failures
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    }
}

/// Writes a report to stdout, as text or pretty JSON.
pub fn print_report<R: Display + Serialize>(report: &R, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

/// Maps a run outcome onto the process exit status.
pub fn finish(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
