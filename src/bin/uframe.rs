use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use uframe_inventory::bench::read_bench_rows;
use uframe_inventory::catalog::CatalogClient;
use uframe_inventory::config::{BASE_URL_ENV, ConfigLoader, EndpointOverrides};
use uframe_inventory::domain::{FileFormat, RecordLimit, ReferenceDesignator};
use uframe_inventory::error::UframeError;
use uframe_inventory::http::HttpTransport;
use uframe_inventory::output::{CsvOutput, JsonOutput, ReportFormat, StreamMapColumns};
use uframe_inventory::query::{build_query_urls, read_stream_rows};
use uframe_inventory::url::RequestFlags;
use uframe_inventory::walker::WalkOptions;
use uframe_inventory::window::{Delta, DeltaType};

#[derive(Parser)]
#[command(name = "uframe")]
#[command(about = "Discover and download time-series sensor data from a uFrame catalog server")]
#[command(version)]
struct Cli {
    /// Alternate uFrame server url (must start with http://)
    #[arg(short = 'b', long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true)]
    port: Option<u16>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// JSON config file (default: ./uframe.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "List the arrays available on the server")]
    Arrays,
    #[command(about = "Download the most recent data of every stream of an array")]
    Walk(WalkArgs),
    #[command(about = "Map parameters to the streams that carry them")]
    Map(MapArgs),
    #[command(about = "List the streams of one reference designator")]
    Streams(StreamsArgs),
    #[command(about = "Find every deployment of a stream across all arrays")]
    Deployments(DeploymentsArgs),
    #[command(about = "Build full-deployment request urls from a deployments csv")]
    QueryUrls(QueryUrlsArgs),
    #[command(about = "Test stream and parameter availability listed in a csv")]
    Availability(AvailabilityArgs),
    #[command(about = "Measure download volume over time for streams listed in a csv")]
    Bench(BenchArgs),
}

#[derive(Args)]
struct WalkArgs {
    array: String,

    /// Destination directory (default: current directory)
    #[arg(short, long)]
    dest: Option<Utf8PathBuf>,

    #[arg(long, value_enum, default_value_t = DeltaType::Days)]
    delta_type: DeltaType,

    /// Amount subtracted from each stream's end time (at least 1)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    delta_value: u32,

    /// Do not execute data product algorithms
    #[arg(long)]
    no_dpa: bool,

    /// Print the request urls without downloading
    #[arg(short, long)]
    url_only: bool,

    #[arg(long, value_enum, default_value_t = FileFormat::Netcdf)]
    format: FileFormat,

    #[arg(long)]
    provenance: bool,

    /// Request every record instead of the default cap
    #[arg(long)]
    no_limit: bool,
}

#[derive(Args)]
struct MapArgs {
    /// Restrict to one array (default: all arrays)
    #[arg(long, conflicts_with = "refdes")]
    array: Option<String>,

    /// Map a single reference designator (e.g. CE01ISSM-MFD35-02-PRESFA000)
    #[arg(short, long)]
    refdes: Option<String>,

    /// Only streams of this method (e.g. telemetered)
    #[arg(long)]
    method: Option<String>,

    #[arg(short, long, value_enum, default_value_t = ReportFormat::Csv)]
    format: ReportFormat,

    /// Print the entire metadata record
    #[arg(short, long)]
    all: bool,

    /// Print the metadata url of each row
    #[arg(short, long)]
    urls: bool,

    /// Print the number of particles of each stream
    #[arg(short, long)]
    particles: bool,
}

#[derive(Args)]
struct StreamsArgs {
    refdes: String,

    #[arg(short, long, value_enum, default_value_t = ReportFormat::Csv)]
    format: ReportFormat,
}

#[derive(Args)]
struct DeploymentsArgs {
    stream: String,

    #[arg(short, long, value_enum, default_value_t = ReportFormat::Csv)]
    format: ReportFormat,
}

#[derive(Args)]
struct QueryUrlsArgs {
    csv: PathBuf,
}

#[derive(Args)]
struct AvailabilityArgs {
    csv: PathBuf,

    /// Results file (default: <input>-test_results.csv)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct BenchArgs {
    csv: PathBuf,

    #[arg(long, value_enum, default_value_t = FileFormat::Netcdf)]
    format: FileFormat,

    #[arg(long)]
    no_dpa: bool,

    #[arg(short, long)]
    url_only: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<UframeError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &UframeError) -> u8 {
    match error {
        UframeError::ArrayNotFound(_)
        | UframeError::InvalidDeltaType(_)
        | UframeError::MissingIdentifier(_)
        | UframeError::InvalidReferenceDesignator(_)
        | UframeError::InvalidEndpoint(_)
        | UframeError::MissingColumn(_)
        | UframeError::ConfigRead(_)
        | UframeError::ConfigParse(_) => 2,
        UframeError::Transport(_) | UframeError::Status { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let env_base_url = std::env::var(BASE_URL_ENV).ok();
    let overrides = EndpointOverrides {
        base_url: cli.base_url,
        port: cli.port,
        timeout_secs: cli.timeout,
    };
    let endpoint = ConfigLoader::resolve_endpoint(&config, env_base_url.as_deref(), &overrides)?;
    let client = CatalogClient::new(endpoint)?;

    match cli.command {
        Command::Arrays => run_arrays(&client),
        Command::Walk(args) => run_walk(&client, args),
        Command::Map(args) => run_map(&client, args),
        Command::Streams(args) => run_streams(&client, args),
        Command::Deployments(args) => run_deployments(&client, args),
        Command::QueryUrls(args) => run_query_urls(&client, args),
        Command::Availability(args) => run_availability(&client, args),
        Command::Bench(args) => run_bench(&client, args),
    }
}

type Client = CatalogClient<HttpTransport>;

fn run_arrays(client: &Client) -> miette::Result<()> {
    let arrays = client.list_arrays(None);
    if arrays.is_empty() {
        return Err(miette::Report::msg(format!(
            "no arrays found for uFrame instance: {}",
            client.endpoint()
        )));
    }
    println!("Available arrays:");
    for array in arrays {
        println!("{array}");
    }
    Ok(())
}

fn run_walk(client: &Client, args: WalkArgs) -> miette::Result<()> {
    let dest_root = match args.dest {
        Some(dest) => dest,
        None => Utf8PathBuf::from_path_buf(std::env::current_dir().into_diagnostic()?)
            .map_err(|_| miette::Report::msg("current directory is not valid UTF-8"))?,
    };
    let options = WalkOptions {
        delta: Delta::new(args.delta_type, args.delta_value),
        dest_root: Some(dest_root),
        flags: RequestFlags {
            format: args.format,
            exec_dpa: !args.no_dpa,
            include_provenance: args.provenance,
            limit: RecordLimit::from_flag(!args.no_limit),
        },
        url_only: args.url_only,
    };
    let report = client.walk_array(&args.array, &options)?;
    CsvOutput::write_outcomes(io::stdout().lock(), &report.outcomes, args.url_only)?;
    tracing::info!(
        fetched = report.outcomes.len(),
        skipped = report.skipped.len(),
        "walk of {} finished",
        report.array
    );
    Ok(())
}

fn run_map(client: &Client, args: MapArgs) -> miette::Result<()> {
    let method = args.method.as_deref();
    let entries = match args.refdes {
        Some(refdes) => {
            let refdes: ReferenceDesignator = refdes.parse()?;
            client.map_reference_designator(&refdes, method)
        }
        None => client.map_array_streams(args.array.as_deref(), method),
    };
    match args.format {
        ReportFormat::Json => JsonOutput::print(&entries).into_diagnostic()?,
        ReportFormat::Csv => {
            let columns = StreamMapColumns {
                all: args.all,
                particles: args.particles,
                urls: args.urls,
            };
            CsvOutput::write_stream_map(io::stdout().lock(), &entries, columns)?;
        }
    }
    Ok(())
}

fn run_streams(client: &Client, args: StreamsArgs) -> miette::Result<()> {
    let refdes: ReferenceDesignator = args.refdes.parse()?;
    let streams = client.sensor_streams(&refdes);
    if streams.is_empty() {
        return Err(miette::Report::msg(format!("no streams found for {refdes}")));
    }
    match args.format {
        ReportFormat::Json => JsonOutput::print(&streams).into_diagnostic()?,
        ReportFormat::Csv => CsvOutput::write_stream_records(io::stdout().lock(), &streams)?,
    }
    Ok(())
}

fn run_deployments(client: &Client, args: DeploymentsArgs) -> miette::Result<()> {
    let deployments = client.find_stream_deployments(&args.stream);
    if deployments.is_empty() {
        return Err(miette::Report::msg(format!(
            "no reference designators found for stream: {}",
            args.stream
        )));
    }
    match args.format {
        ReportFormat::Json => JsonOutput::print(&deployments).into_diagnostic()?,
        ReportFormat::Csv => CsvOutput::write_stream_records(io::stdout().lock(), &deployments)?,
    }
    Ok(())
}

fn run_query_urls(client: &Client, args: QueryUrlsArgs) -> miette::Result<()> {
    let file = File::open(&args.csv).into_diagnostic()?;
    let rows = read_stream_rows(file)?;
    for url in build_query_urls(client.endpoint(), &rows) {
        println!("{url}");
    }
    Ok(())
}

fn run_availability(client: &Client, args: AvailabilityArgs) -> miette::Result<()> {
    let output = client.test_availability(&args.csv, args.out.as_deref())?;
    println!("{}", output.display());
    Ok(())
}

fn run_bench(client: &Client, args: BenchArgs) -> miette::Result<()> {
    let file = File::open(&args.csv).into_diagnostic()?;
    let rows = read_bench_rows(file)?;
    let flags = RequestFlags {
        format: args.format,
        exec_dpa: !args.no_dpa,
        include_provenance: false,
        limit: RecordLimit::Unlimited,
    };
    let report = client.benchmark(&rows, &flags, args.url_only)?;
    if args.url_only {
        for url in &report.urls {
            println!("{url}");
        }
        return Ok(());
    }
    println!("##############################################");
    println!(
        "File Downloads: succeeded={}, failed={}",
        report.succeeded, report.failed
    );
    println!("Total Bytes Downloaded: {}", report.total_bytes);
    if let Some(elapsed) = report.elapsed_secs {
        println!("Total Elapsed Time: {elapsed} seconds");
    }
    if let Some(rate) = report.megabytes_per_sec() {
        println!("Volume-Over-Time: {rate} MB/sec");
    }
    println!("##############################################");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_rejects_zero_delta_value() {
        let parsed = Cli::try_parse_from(["uframe", "walk", "CE01ISSM", "--delta-value", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn walk_accepts_positive_delta_value() {
        let cli = Cli::try_parse_from(["uframe", "walk", "CE01ISSM", "--delta-value", "3"]).unwrap();
        let Command::Walk(args) = cli.command else {
            panic!("expected walk command");
        };
        assert_eq!(args.delta_value, 3);
        assert_eq!(args.delta_type, DeltaType::Days);
    }
}
