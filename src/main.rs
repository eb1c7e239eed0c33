use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use braidnet::io;
use braidnet::{
    bidirectional_sand_function, water_flow_sand_function, Boundary, HeightMap, InputDcel,
    LinkSequence, MsComplex, MsComplexCreator, MsComplexSimplifier, MsToNetworkGraphCreator,
    Network, NetworkCreator, NetworkGraph, NetworkGraphCreator, Progress, SandCache,
    SortedPathsCreator, Striation, StriationCreator, StriationStrategy, Units,
};

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
enum Algorithm {
    /// The striation-based algorithm.
    Striation,
    /// The persistence-based algorithm.
    Persistence,
}

/// An implementation of braided-river channel network algorithms.
#[derive(Parser, Debug)]
#[command(name = "braidnet", version, about)]
struct Args {
    /// The input river image or text file.
    input: PathBuf,

    /// The output network file. `.txt` or `.ipe` is appended
    /// automatically. If more than one δ-value is given, the output files
    /// are suffixed with the corresponding δ-values.
    output: String,

    /// Selects the algorithm to use.
    #[arg(short, long, value_enum, default_value_t = Algorithm::Striation)]
    algorithm: Algorithm,

    /// A list of δ-values, in m³, separated by semicolons. This can only
    /// be used with the `striation` algorithm. Scientific notation can be
    /// used, e.g. `--delta 100;1e3;1e4`.
    #[arg(short, long, value_name = "δ;δ;...")]
    delta: Option<String>,

    /// Causes the --delta option to be interpreted in internal units
    /// instead of m³. Provided for compatibility only.
    #[arg(long = "deltaInternalUnits")]
    delta_internal_units: bool,

    /// Use the bidirectional sand function. This can only be used with the
    /// `striation` algorithm.
    #[arg(short, long)]
    bidirectional: bool,

    /// Simplify the output graph by removing the degree-2 vertices. This
    /// can only be used with the `striation` algorithm.
    #[arg(short, long)]
    simplify: bool,

    /// Use the hybrid striation strategy instead of the highest
    /// persistence first strategy.
    #[arg(long = "hybridStriation")]
    hybrid_striation: bool,

    /// Sets the x-resolution of the river, in meters per pixel.
    #[arg(long = "xRes", value_name = "resolution")]
    x_res: Option<f64>,

    /// Sets the y-resolution of the river, in meters per pixel.
    #[arg(long = "yRes", value_name = "resolution")]
    y_res: Option<f64>,

    /// Sets the minimum elevation of the river, in meters.
    #[arg(long = "minHeight", value_name = "elevation")]
    min_height: Option<f64>,

    /// Sets the maximum elevation of the river, in meters.
    #[arg(long = "maxHeight", value_name = "elevation")]
    max_height: Option<f64>,

    /// Output an Ipe figure instead of a text file describing the graph.
    #[arg(long)]
    ipe: bool,

    /// Output a link sequence instead of a text file describing the graph.
    #[arg(long)]
    links: bool,

    /// A river boundary file to read. If this is not given, the entire
    /// extent of the river image is used.
    #[arg(long, value_name = "filename")]
    boundary: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::default().filter_or(
        env_logger::DEFAULT_FILTER_ENV,
        "info",
    ));
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let persistence = args.algorithm == Algorithm::Persistence;

    // read the input as an image, falling back to the text format
    let mut units = Units::default();
    let map = match image::open(&args.input) {
        Ok(image) => HeightMap::from_image(&image),
        Err(_) => match io::read_text_heightmap(&args.input) {
            Ok((map, text_units)) => {
                units = text_units;
                map
            }
            Err(error) => {
                return Err(format!(
                    "Could not read image or text file \"{}\".\n\
                     Reading the text file failed due to the following error: {}",
                    args.input.display(),
                    error
                ));
            }
        },
    };

    let (mut deltas, delta_strings) = parse_deltas(&args, persistence)?;

    if args.bidirectional && persistence {
        return Err(
            "The --bidirectional option cannot be used with the `persistence` algorithm."
                .to_string(),
        );
    }
    if args.simplify && persistence {
        return Err(
            "The --simplify option cannot be used with the `persistence` algorithm.".to_string(),
        );
    }
    if args.delta_internal_units && args.delta.is_none() {
        return Err(
            "The --deltaInternalUnits option cannot be used without the --delta option."
                .to_string(),
        );
    }
    #[cfg(not(feature = "ipe"))]
    if args.ipe {
        return Err("The --ipe option cannot be used because this program has not been \
                    compiled with Ipe support."
            .to_string());
    }
    if args.ipe && args.links {
        return Err("The --ipe and --links options cannot be used at the same time.".to_string());
    }

    if let Some(x_res) = args.x_res {
        units.x_resolution = x_res;
    }
    if let Some(y_res) = args.y_res {
        units.y_resolution = y_res;
    }
    if let Some(min_height) = args.min_height {
        units.min_elevation = min_height;
    }
    if let Some(max_height) = args.max_height {
        units.max_elevation = max_height;
    }

    if !args.delta_internal_units {
        for delta in &mut deltas {
            *delta = units.from_real_volume(*delta);
        }
    }

    let boundary = match &args.boundary {
        Some(path) => io::read_boundary(path, &map).map_err(|error| {
            format!(
                "Reading the river boundary file failed due to the following error: {error}"
            )
        })?,
        None => Boundary::around(&map),
    };

    eprintln!("Computing input DCEL...");
    let mut dcel = InputDcel::new(&map, &boundary, units);
    dcel.split_monkey_saddles();

    eprint!("Computing MS complex...     ");
    let mut complex = MsComplex::new();
    let mut reporter = stderr_progress();
    MsComplexCreator::new(&mut dcel, &mut complex, Progress::with(&mut reporter)).create();
    eprintln!();

    let mut striation = Striation::new();
    let mut sorted_paths = Vec::new();

    if !persistence {
        let source = dcel.vertex(dcel.source()).ms_vertex;
        let sink = dcel.vertex(dcel.sink()).ms_vertex;
        if source.is_end() || sink.is_end() {
            return Err("The river has no source or no sink.".to_string());
        }
        let strategy = if args.hybrid_striation {
            StriationStrategy::Hybrid
        } else {
            StriationStrategy::HighestPersistenceFirst
        };

        eprint!("Computing striation...     ");
        let mut reporter = stderr_progress();
        StriationCreator::new(
            &complex,
            &mut striation,
            source,
            sink,
            units,
            strategy,
            Progress::with(&mut reporter),
        )
        .create();
        eprintln!();

        eprint!("Sorting striation paths on height...     ");
        let mut reporter = stderr_progress();
        SortedPathsCreator::new(
            &complex,
            &striation,
            &mut sorted_paths,
            Progress::with(&mut reporter),
        )
        .create();
        eprintln!();
    }

    eprintln!("Initializing sand cache...");
    let sand_function = if args.bidirectional {
        bidirectional_sand_function
    } else {
        water_flow_sand_function
    };
    let mut sand_cache = SandCache::new(&complex, &striation, sand_function);

    for (delta, delta_string) in deltas.iter().zip(&delta_strings) {
        let prefix = if deltas.len() > 1 {
            eprintln!("δ = {delta_string}:");
            "    "
        } else {
            ""
        };

        let mut graph = NetworkGraph::new();

        if persistence {
            eprint!("{prefix}Simplifying MS complex...     ");
            let mut simplified = complex.clone();
            let mut reporter = stderr_progress();
            MsComplexSimplifier::new(&mut simplified, Progress::with(&mut reporter)).simplify();
            eprintln!();

            eprintln!("{prefix}Compacting MS complex...");
            simplified.compact();

            eprint!("{prefix}Converting MS complex into network...     ");
            let mut reporter = stderr_progress();
            MsToNetworkGraphCreator::new(
                &simplified,
                &dcel,
                &mut graph,
                Progress::with(&mut reporter),
            )
            .create();
            eprintln!();
        } else {
            eprint!("{prefix}Computing representative network...     ");
            let mut network = Network::new();
            let mut reporter = stderr_progress();
            NetworkCreator::new(
                &mut sand_cache,
                &sorted_paths,
                *delta,
                &mut network,
                Progress::with(&mut reporter),
            )
            .create();
            eprintln!();

            eprint!("{prefix}Converting network into graph...     ");
            let mut reporter = stderr_progress();
            NetworkGraphCreator::new(
                &complex,
                &dcel,
                &network,
                &mut graph,
                args.simplify,
                Progress::with(&mut reporter),
            )
            .create();
            eprintln!();
        }

        eprintln!("{prefix}Writing graph...");
        let suffix = if deltas.len() > 1 {
            format!("-δ-{delta_string}")
        } else {
            String::new()
        };
        write_output(&args, &map, &graph, &units, &suffix)?;
    }

    Ok(())
}

fn parse_deltas(args: &Args, persistence: bool) -> Result<(Vec<f64>, Vec<String>), String> {
    match &args.delta {
        Some(value) => {
            if persistence {
                return Err(
                    "The --delta option cannot be used with the `persistence` algorithm."
                        .to_string(),
                );
            }
            let strings: Vec<String> = value.split(';').map(str::to_string).collect();
            let mut deltas = Vec::with_capacity(strings.len());
            for s in &strings {
                let delta: f64 = s
                    .parse()
                    .map_err(|_| format!("δ-value (--delta) \"{s}\" must be a number."))?;
                deltas.push(delta);
            }
            Ok((deltas, strings))
        }
        None => Ok((vec![100.0], vec!["100".to_string()])),
    }
}

fn write_output(
    args: &Args,
    map: &HeightMap,
    graph: &NetworkGraph,
    units: &Units,
    suffix: &str,
) -> Result<(), String> {
    let report = |error: std::io::Error| format!("Could not write output file: {error}");

    if args.ipe {
        #[cfg(feature = "ipe")]
        {
            let path = PathBuf::from(format!("{}{}.ipe", args.output, suffix));
            io::write_ipe_to_path(map, graph, units, &path).map_err(report)?;
        }
        #[cfg(not(feature = "ipe"))]
        let _ = map;
    } else if args.links {
        let links = LinkSequence::new(graph);
        let path = PathBuf::from(format!("{}{}.txt", args.output, suffix));
        io::write_link_sequence_to_path(&links, units, &path).map_err(report)?;
    } else {
        let path = PathBuf::from(format!("{}{}.txt", args.output, suffix));
        io::write_graph_to_path(graph, units, &path).map_err(report)?;
    }
    Ok(())
}

/// Mimics the original CLI's in-place percentage display.
fn stderr_progress() -> impl FnMut(u32) {
    |p: u32| eprint!("\u{8}\u{8}\u{8}\u{8}{p:>3}%")
}
