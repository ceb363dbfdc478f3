//! Command-line front end: map a formula or a BLIF network onto K-input LUTs.
//!
//! Run with:
//! ```bash
//! cargo run --example lutmap -- "(a & b) | (c ^ d) | (e <=> f)"
//! cargo run --example lutmap -- --blif circuit.blif --strategy basemap -o mapped.blif
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::info;
use simplelog::LevelFilter;

use bdd_lutmap::blif::{read_blif, write_blif, BlifConfig, BlifNetwork};
use bdd_lutmap::builder::BuilderKind;
use bdd_lutmap::mapper::{LutMapper, MapperConfig, Strategy};
use bdd_lutmap::order::OrderHeuristic;
use bdd_lutmap::parser::parse_formula;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum StrategyArg {
    Basemap,
    Fusemap,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum BuilderArg {
    Naive,
    Quasi,
    Full,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Formula to map, or path to a BLIF file with `--blif`.
    #[clap(value_name = "INPUT")]
    input: String,

    /// Treat INPUT as a BLIF file and map all of its outputs.
    #[clap(long)]
    blif: bool,

    /// Output wire name in formula mode.
    #[clap(long, value_name = "NAME", default_value = "out")]
    name: String,

    /// Mapping strategy.
    #[clap(long, value_enum, default_value = "fusemap")]
    strategy: StrategyArg,

    /// Diagram builder.
    #[clap(long, value_enum, default_value = "quasi")]
    builder: BuilderArg,

    /// Variable order: none, weight, count, subgraph, mixed, or a comma-separated list.
    #[clap(long, value_name = "ORDER", default_value = "mixed")]
    order: String,

    /// Disable sifting.
    #[clap(long)]
    no_sift: bool,

    /// Number of LUT inputs.
    #[clap(long, value_name = "INT", default_value = "5")]
    lut_size: usize,

    /// Physical LUT sizes used for padding in the BLIF output.
    #[clap(long, value_name = "INT,...", value_delimiter = ',', default_value = "5")]
    lut_sizes: Vec<usize>,

    /// Write the mapped BLIF here instead of stdout.
    #[clap(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Dump every diagram about to be cut as DOT into this directory.
    #[clap(long, value_name = "DIR")]
    dump_dir: Option<PathBuf>,

    /// Log level.
    #[clap(long, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        args.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = Instant::now();

    let network = if args.blif {
        read_blif(&args.input)?
    } else {
        let formula = parse_formula(&args.input)?;
        BlifNetwork {
            model: None,
            inputs: formula.variables(),
            outputs: vec![(args.name.clone(), formula)],
        }
    };
    info!(
        "Read network with {} inputs and {} outputs",
        network.inputs.len(),
        network.outputs.len()
    );

    let strategy = match args.strategy {
        StrategyArg::Basemap => Strategy::LevelByLevel,
        StrategyArg::Fusemap => Strategy::FuseRecurse,
    };
    let config = MapperConfig {
        lut_size: args.lut_size,
        sift: !args.no_sift,
        order: args.order.parse::<OrderHeuristic>()?,
        builder: match args.builder {
            BuilderArg::Naive => BuilderKind::Naive,
            BuilderArg::Quasi => BuilderKind::QuasiReduced,
            BuilderArg::Full => BuilderKind::FullyReduced,
        },
        dump_dir: args.dump_dir.clone(),
        ..MapperConfig::default()
    };
    let mut mapper = LutMapper::new(strategy, config);

    let time_mapping = Instant::now();
    let luts = mapper.map_network(&network)?;
    info!(
        "Mapped to {} LUTs in {:.3} s",
        luts.len(),
        time_mapping.elapsed().as_secs_f64()
    );

    let blif_config = BlifConfig {
        lut_sizes: args.lut_sizes.clone(),
        ..BlifConfig::default()
    };
    let outputs = network.output_names();
    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_blif(&mut writer, &network.inputs, &outputs, &luts, &blif_config)?;
            writer.flush()?;
            info!("Wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            write_blif(&mut writer, &network.inputs, &outputs, &luts, &blif_config)?;
        }
    }

    println!("{}|{}", time_mapping.elapsed().as_millis(), luts.len());
    info!("All done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
