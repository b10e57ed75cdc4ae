use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{PathBuf, absolute};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use clap::builder::styling::Styles;
use clap::{Args, ColorChoice, Parser, Subcommand, crate_version};
use clap_cargo::style::{ERROR, HEADER, INVALID, LITERAL, PLACEHOLDER, USAGE, VALID};
use tracing::level_filters::LevelFilter;
use tracing::{Level, debug, enabled, error, info, instrument, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry, fmt};
use trackfit::internal::report::{conversion_report, sports_report};
use trackfit::{
    ConvertOptions, FitActivityOptions, FitEncodeError, TrackOptions, TrackfitError, known_labels,
};

pub const CLAP_STYLING: Styles = Styles::styled()
    .header(HEADER)
    .usage(USAGE)
    .literal(LITERAL)
    .placeholder(PLACEHOLDER)
    .error(ERROR)
    .valid(VALID)
    .invalid(INVALID);

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{} (FIT profile {}, rustc {})",
        crate_version!(),
        trackfit::PROFILE_VERSION,
        env!("RUSTC_VERSION"),
    )
});

/// Convert recorded GPS activities into Garmin FIT activity files
///
/// Given a GPX file recorded by a phone or watch, produces a FIT activity
/// file with per-point records, laps, and a session summary, suitable for
/// importing into Garmin Connect or other training logs.
#[derive(Parser)]
#[command(
    name = "trackfit",
    version,
    long_version = LONG_VERSION.as_str(),
    about,
    color = ColorChoice::Auto,
    styles = CLAP_STYLING,
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,

    /// Configure diagnostic logging level
    ///
    /// Set to DEBUG to see a performance summary following execution, but be
    /// aware this has a non-negligible performance impact on debug builds.
    #[clap(long, short = 'L', default_value_t = Level::ERROR)]
    log_level: Level,

    /// Log to a file
    #[clap(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// GPX input path
    input: PathBuf,

    /// FIT file output path
    ///
    /// If unspecified, defaults to <INPUT>.fit in the same directory as the
    /// input file.
    #[clap(long, short)]
    output: Option<PathBuf>,

    /// Force overwriting the output file, if it already exists.
    #[clap(long, short, action)]
    force: bool,

    /// Activity label, such as "cycling" or "trail running"
    ///
    /// Run the `sports` subcommand for the recognized labels. Anything else
    /// is written as a generic activity.
    #[clap(long, short = 'p', default_value = "generic")]
    sport: String,

    /// Put every point in a single lap instead of starting a lap for each GPX
    /// track segment.
    #[clap(long, action)]
    no_segment_laps: bool,

    /// FIT manufacturer ID to record in the file
    #[clap(long, default_value_t = 255)]
    manufacturer: u16,

    /// FIT product ID to record in the file
    #[clap(long, default_value_t = 0)]
    product: u16,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a GPX track to a FIT activity file
    ///
    /// The GPX file must contain exactly one track. Trackpoints without a
    /// time are skipped.
    Convert(ConvertArgs),

    /// List the recognized activity labels and their FIT sport codes
    Sports,
}

#[instrument(level = "trace", skip_all)]
fn convert_cmd(sub_args: &ConvertArgs) -> Result<String> {
    debug!("convert args: {:?}", sub_args);

    let gpx_file = BufReader::new(
        File::open(&sub_args.input)
            .context("Opening the GPX <INPUT> file. Check that it exists and can be accessed.")?,
    );
    info!("Opened GPX input file: {:?}", absolute(&sub_args.input)?);

    let output = match &sub_args.output {
        Some(p) => p,
        None => &sub_args.input.with_extension("fit"),
    };

    if ((sub_args.force && enabled!(Level::WARN)) || (!sub_args.force && enabled!(Level::ERROR)))
        && output.exists()
    {
        if sub_args.force {
            warn!("Output file exists and will be overwritten: {:?}", output);
        } else {
            error!(
                "Output file already exists and may not be overwritten: {:?}",
                output
            );
        }
    }
    let fit_file = BufWriter::new(
        if sub_args.force {
            File::create(output)
        } else {
            File::create_new(output)
        }
        .context("Creating the <OUTPUT> file")?,
    );
    info!("Created FIT output file: {:?}", absolute(output)?);

    let options = ConvertOptions::default()
        .with_sport_label(sub_args.sport.as_str())
        .with_track_options(
            TrackOptions::default().with_lap_per_segment(!sub_args.no_segment_laps),
        )
        .with_fit_options(
            FitActivityOptions::default()
                .with_manufacturer(sub_args.manufacturer)
                .with_product(sub_args.product),
        );

    let res = trackfit::convert_gpx_to_fit(gpx_file, fit_file, &options);
    let info = match &res {
        Err(TrackfitError::Gpx(_)) => {
            res.context("The <INPUT> is not a valid GPX file. Check that it is correct.")
        }

        Err(TrackfitError::TrackCount(0)) => res.context(concat!(
            "No track was found in the <INPUT> file. Ensure it is a valid GPX ",
            "file containing a recorded track."
        )),

        Err(TrackfitError::TrackCount(_)) => res.context(concat!(
            "The <INPUT> file contains more than one track. Split it into one ",
            "file per activity."
        )),

        Err(TrackfitError::FitEncode(FitEncodeError::Io(_))) => res.context(concat!(
            "Writing the FIT output to the filesystem. Ensure the output path exists and ",
            "that you have access permissions to write there."
        )),

        _ => res.map_err(anyhow::Error::from),
    }?;

    let mut r = conversion_report(&info)?;
    r.push_str(&format!(
        "\nOutput is in {}\n",
        absolute(output)
            .unwrap_or(output.to_path_buf())
            .to_string_lossy()
    ));
    Ok(r)
}

fn sports_cmd() -> Result<String> {
    Ok(sports_report(&known_labels())?)
}

fn main() -> Result<()> {
    // Intentionally avoid wrapping argument parsing errors in anyhow::Result so
    // we preserve Clap's pretty formatting of usage info.
    let args = Cli::parse();

    let log_w: Box<dyn std::io::Write + Send> = match &args.log_file {
        Some(path) => Box::new(File::create(path).context("Creating the log file")?),
        None => Box::new(std::io::stderr()),
    };
    let (appender, _guard) = tracing_appender::non_blocking(log_w);

    // Enable the TRACE-level span tree layer for fmt logging level DEBUG.
    let fmt_layer = fmt::Layer::new()
        .with_writer(appender)
        .with_ansi(args.log_file.is_none())
        .with_target(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
        .with_filter(LevelFilter::from_level(args.log_level));
    if args.log_level >= Level::DEBUG {
        let span_tree_layer = tracing_span_tree::SpanTree::default().aggregate(true);
        tracing::subscriber::set_global_default(
            Registry::default().with(fmt_layer).with(span_tree_layer),
        )?;
    } else {
        tracing::subscriber::set_global_default(Registry::default().with(fmt_layer))?;
    }

    debug!("trackfit {}", clap::crate_version!());

    let report = match &args.cmd {
        Commands::Convert(sub_args) => convert_cmd(sub_args),
        Commands::Sports => sports_cmd(),
    }?;

    print!("{report}");
    Ok(())
}
