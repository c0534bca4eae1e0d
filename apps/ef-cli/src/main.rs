use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ef_results::{ensemble_mean, ensemble_percentile, interpolate_simulation_result, io};
use ef_study::ParameterStudy;
use tracing::info;

/// Meta-population SECIHURD ensemble runner.
#[derive(Parser)]
#[command(name = "ef-cli")]
#[command(about = "epiflow - meta-population epidemic simulation", long_about = None)]
struct Cli {
    /// Path to the graph/parameter JSON file
    #[arg(long)]
    params: PathBuf,

    /// Output directory for result tables
    #[arg(long)]
    out: PathBuf,

    /// Number of ensemble runs
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Simulation start time (days)
    #[arg(long, default_value_t = 0.0)]
    t0: f64,

    /// Simulation end time (days)
    #[arg(long)]
    tmax: f64,

    /// Migration tick (days)
    #[arg(long, default_value_t = 0.5)]
    dt: f64,

    /// Master random seed; run i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let graph = io::load_graph(&cli.params)
        .with_context(|| format!("loading graph from {}", cli.params.display()))?;
    let region_ids: Vec<u32> = graph.nodes().iter().map(|n| n.region_id).collect();
    info!(
        nodes = graph.num_nodes(),
        edges = graph.num_edges(),
        runs = cli.runs,
        "starting parameter study"
    );

    let study = ParameterStudy::new(graph, cli.t0, cli.tmax, cli.dt, cli.runs, cli.seed);
    let runs = study.run();
    if runs.is_empty() {
        anyhow::bail!("all {} runs failed", cli.runs);
    }

    fs::create_dir_all(&cli.out)
        .with_context(|| format!("creating output directory {}", cli.out.display()))?;

    // per-run, per-node tables on integer days
    let mut ensemble: Vec<Vec<ef_core::TimeSeries>> = Vec::with_capacity(runs.len());
    for run in &runs {
        let interpolated: Vec<_> = run
            .results
            .iter()
            .map(interpolate_simulation_result)
            .collect();
        for (node, series) in interpolated.iter().enumerate() {
            let file = cli
                .out
                .join(format!("run{}_node{}.csv", run.run_idx, region_ids[node]));
            io::save_timeseries_csv(&file, series)
                .with_context(|| format!("writing {}", file.display()))?;
        }
        ensemble.push(interpolated);
    }

    // ensemble summaries per node
    let mean = ensemble_mean(&ensemble);
    for (node, series) in mean.iter().enumerate() {
        let file = cli.out.join(format!("mean_node{}.csv", region_ids[node]));
        io::save_timeseries_csv(&file, series)
            .with_context(|| format!("writing {}", file.display()))?;
    }
    if ensemble.len() > 1 {
        for (tag, p) in [("p25", 0.25), ("p50", 0.5), ("p75", 0.75)] {
            let percentile = ensemble_percentile(&ensemble, p);
            for (node, series) in percentile.iter().enumerate() {
                let file = cli
                    .out
                    .join(format!("{tag}_node{}.csv", region_ids[node]));
                io::save_timeseries_csv(&file, series)
                    .with_context(|| format!("writing {}", file.display()))?;
            }
        }
    }

    info!(
        completed = runs.len(),
        requested = cli.runs,
        out = %cli.out.display(),
        "study finished"
    );
    Ok(())
}
