use std::process::ExitCode;

use anyhow::Context;
use filterbench_cli::{finish, init_logging, parse_args, print_report, BuildArgs};
use filterbench_core::ConstructionBenchmark;
use tracing::debug;

fn run(args: &BuildArgs) -> anyhow::Result<()> {
    let config = args.config();
    config.params.validate().context("invalid index parameters")?;

    let report = ConstructionBenchmark::run(&config).with_context(|| {
        format!(
            "building index from {} into {}",
            config.database_vectors.display(),
            config.index_output.display()
        )
    })?;
    print_report(&report, args.json)
}

fn main() -> ExitCode {
    init_logging();
    let args: BuildArgs = parse_args();
    debug!(?args, "arguments parsed");
    finish(run(&args))
}
