use std::process::ExitCode;
use std::thread;

use anyhow::Context;
use filterbench_cli::{finish, init_logging, parse_args, print_report, QueryArgs};
use filterbench_core::{HnswIndex, QueryBenchmark};
use tracing::debug;

fn run(args: &QueryArgs) -> anyhow::Result<()> {
    let config = args.config()?;
    let mut index = HnswIndex::load(&args.index)
        .with_context(|| format!("loading index {}", args.index.display()))?;

    let report = QueryBenchmark::run(&config, &mut index).with_context(|| {
        format!(
            "querying {} with {} filters",
            args.index.display(),
            config.filter_type
        )
    })?;
    print_report(&report, args.json)
}

fn main() -> ExitCode {
    init_logging();
    let args: QueryArgs = parse_args();
    debug!(?args, "arguments parsed");

    let threads = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    // stdout stays pure JSON under --json
    if args.json {
        eprintln!("Number of threads: {}", threads);
    } else {
        println!("Number of threads: {}", threads);
    }

    finish(run(&args))
}
