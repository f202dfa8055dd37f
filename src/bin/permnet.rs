use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use env_logger;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use permnet::debug;
use permnet::perm;
use permnet::routing::{NetworkTables, PermutationDecomposer, SwitchNetwork, Topology};


fn perm_args<'a, 'b>(cmd: App<'a, 'b>) -> App<'a, 'b> {
    cmd
        .arg(Arg::with_name("perm")
             .takes_value(true)
             .value_name("PERM.JSON")
             .help("permutation to route, as a list of indices (`out[i] = in[perm[i]]`)")
             .required_unless("random"))
        .arg(Arg::with_name("random")
             .long("random")
             .takes_value(true)
             .value_name("N")
             .conflicts_with("perm")
             .help("route a random permutation of N elements instead"))
        .arg(Arg::with_name("seed")
             .long("seed")
             .takes_value(true)
             .value_name("SEED")
             .requires("random")
             .help("seed for --random"))
}

fn output_args<'a, 'b>(cmd: App<'a, 'b>) -> App<'a, 'b> {
    cmd
        .arg(Arg::with_name("format")
             .long("format")
             .takes_value(true)
             .value_name("FORMAT")
             .possible_values(&["json", "yaml", "cbor"])
             .help("output format; defaults to the extension of --output, or json"))
        .arg(Arg::with_name("output")
             .short("o")
             .long("output")
             .takes_value(true)
             .value_name("OUT")
             .help("where to write the result; defaults to stdout"))
}

fn parse_args() -> ArgMatches<'static> {
    App::new("permnet")
        .about("build switching networks and round decompositions for permutations")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(output_args(perm_args(SubCommand::with_name("build")))
            .about("route a permutation through a switching network and write its tables")
            .arg(Arg::with_name("topology")
                 .long("topology")
                 .takes_value(true)
                 .value_name("TOPOLOGY")
                 .possible_values(&["waksman", "benes"])
                 .default_value("waksman")
                 .help("network topology"))
            .arg(Arg::with_name("svg")
                 .long("svg")
                 .takes_value(true)
                 .value_name("OUT.SVG")
                 .help("also draw the network to this file"))
            .arg(Arg::with_name("highlight")
                 .long("highlight")
                 .takes_value(true)
                 .value_name("OUTPUT")
                 .requires("svg")
                 .help("highlight the path feeding this output in the --svg drawing"))
            .arg(Arg::with_name("dump")
                 .long("dump")
                 .help("print the switches of every level to stderr"))
        )
        .subcommand(output_args(perm_args(SubCommand::with_name("decompose")))
            .about("split a permutation into rounds of permutations on small groups")
            .arg(Arg::with_name("block-size")
                 .short("t")
                 .long("block-size")
                 .takes_value(true)
                 .value_name("T")
                 .required(true)
                 .help("size of each group; a power of two"))
        )
        .subcommand(SubCommand::with_name("check")
            .about("validate network tables and print the permutation they realize")
            .arg(Arg::with_name("tables")
                 .takes_value(true)
                 .value_name("TABLES.JSON")
                 .help("network tables, as written by `build`")
                 .required(true))
            .arg(Arg::with_name("perm")
                 .long("perm")
                 .takes_value(true)
                 .value_name("PERM.JSON")
                 .help("fail unless the tables realize this permutation"))
        )
        .get_matches()
}


type Error = String;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Format {
    Json,
    Yaml,
    Cbor,
}

impl Format {
    fn from_name(s: &str) -> Option<Format> {
        match s {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "cbor" => Some(Format::Cbor),
            _ => None,
        }
    }

    fn from_path(path: &Path) -> Option<Format> {
        path.extension().and_then(|os| os.to_str()).and_then(Format::from_name)
    }
}

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let content = fs::read(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let value = match Format::from_path(path) {
        Some(Format::Yaml) => serde_yaml::from_slice(&content).map_err(|e| e.to_string()),
        Some(Format::Cbor) => serde_cbor::from_slice(&content).map_err(|e| e.to_string()),
        Some(Format::Json) | None => serde_json::from_slice(&content).map_err(|e| e.to_string()),
    };
    value.map_err(|e| format!("failed to parse {}: {}", path.display(), e))
}

fn write_output<T: Serialize>(args: &ArgMatches, value: &T) -> Result<(), Error> {
    let path = args.value_of("output").map(Path::new);
    let format = args.value_of("format").and_then(Format::from_name)
        .or_else(|| path.and_then(Format::from_path))
        .unwrap_or(Format::Json);

    let mut bytes = match format {
        Format::Json => serde_json::to_vec_pretty(value).map_err(|e| e.to_string())?,
        Format::Yaml => serde_yaml::to_vec(value).map_err(|e| e.to_string())?,
        Format::Cbor => serde_cbor::to_vec(value).map_err(|e| e.to_string())?,
    };
    if format != Format::Cbor && !bytes.ends_with(b"\n") {
        bytes.push(b'\n');
    }

    match path {
        Some(path) => fs::write(path, &bytes)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e)),
        None => io::stdout().write_all(&bytes).map_err(|e| e.to_string()),
    }
}

fn parse_num<T: std::str::FromStr>(args: &ArgMatches, name: &str) -> Result<Option<T>, Error> {
    match args.value_of(name) {
        Some(s) => s.parse().map(Some)
            .map_err(|_| format!("invalid value for --{}: {:?}", name, s)),
        None => Ok(None),
    }
}

/// Load the permutation named on the command line, or generate one for `--random`.
fn get_perm(args: &ArgMatches) -> Result<Vec<u32>, Error> {
    if let Some(n) = parse_num::<usize>(args, "random")? {
        let seed = parse_num::<u64>(args, "seed")?.unwrap_or(0);
        info!("using random permutation of {} elements (seed {})", n, seed);
        let mut rng = StdRng::seed_from_u64(seed);
        return Ok(perm::random_permutation(n, &mut rng));
    }
    let path = args.value_of("perm").ok_or("missing permutation")?;
    read_file(Path::new(path))
}

fn run_build(args: &ArgMatches) -> Result<(), Error> {
    let p = get_perm(args)?;
    let topology = args.value_of("topology").unwrap_or("waksman").parse::<Topology>()?;
    let net = SwitchNetwork::new(topology, &p).map_err(|e| e.to_string())?;
    eprintln!(
        "{} network on {} wires: {} levels, {} switches ({} public)",
        topology, net.n(), net.level(), net.num_switches(), net.num_public_switches(),
    );

    if args.is_present("dump") {
        eprint!("{}", debug::dump(&net));
    }
    if let Some(svg_path) = args.value_of("svg") {
        let highlight = parse_num::<u32>(args, "highlight")?;
        if let Some(b) = highlight {
            if b as usize >= net.n() {
                return Err(format!("--highlight {} is out of range for {} wires", b, net.n()));
            }
        }
        let svg = debug::dump_svg(&net, highlight).map_err(|e| e.to_string())?;
        fs::write(svg_path, svg).map_err(|e| format!("failed to write {}: {}", svg_path, e))?;
    }

    write_output(args, &net.tables())
}

fn run_decompose(args: &ArgMatches) -> Result<(), Error> {
    let p = get_perm(args)?;
    let block_size = parse_num::<usize>(args, "block-size")?.ok_or("missing --block-size")?;
    let d = PermutationDecomposer::new(&p, block_size).map_err(|e| e.to_string())?;
    eprintln!(
        "{} rounds of {} groups of {} elements",
        d.rounds(), d.sub_num(), d.block_size(),
    );
    write_output(args, &d)
}

fn run_check(args: &ArgMatches) -> Result<(), Error> {
    let tables_path = args.value_of("tables").ok_or("missing tables")?;
    let tables: NetworkTables = read_file(Path::new(tables_path))?;
    let net = SwitchNetwork::from_tables(tables).map_err(|e| e.to_string())?;
    let realized = net.realized_permutation();
    println!("{:?}", realized);

    if let Some(path) = args.value_of("perm") {
        let expected: Vec<u32> = read_file(Path::new(path))?;
        perm::validate(&expected).map_err(|e| e.to_string())?;
        if realized != expected {
            let i = realized.iter().zip(&expected).position(|(a, b)| a != b)
                .unwrap_or_else(|| realized.len().min(expected.len()));
            return Err(format!(
                "tables do not realize {} (first difference at output {})", path, i,
            ));
        }
        eprintln!("ok");
    }
    Ok(())
}

fn real_main() -> Result<(), Error> {
    let args = parse_args();

    let (cmd, opt_sub_args) = args.subcommand();
    let sub_args = opt_sub_args.ok_or("missing subcommand")?;
    match cmd {
        "build" => run_build(sub_args),
        "decompose" => run_decompose(sub_args),
        "check" => run_check(sub_args),
        _ => Err(format!("unknown subcommand {:?}", cmd)),
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = real_main() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
