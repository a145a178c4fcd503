use clap::Parser as ClapParser;
use eti_dedup::{Config, Error, FctSource, Filter, Summary, Verdict};
use std::{
    fs,
    io::{self, BufReader, BufWriter},
    path::PathBuf,
    process::ExitCode,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Removes duplicate frames from a raw ETI file
///
/// Frames are only copied when their FCT increases, the FCTs are read from
/// the etisnoop report on stdin:
///
///   etisnoop -v -i in.eti | eti-dedup in.eti out.eti
#[derive(Debug, clap::Parser)]
#[command(version)]
struct Opts {
    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Read the FCT from each frame's header instead of the report on stdin
    #[arg(long)]
    pub frame_header: bool,

    /// Frame size in bytes
    #[arg(long)]
    pub frame_size: Option<usize>,

    /// Print the run summary (YAML) once done
    #[arg(long)]
    pub summary: bool,

    /// The raw ETI input file
    pub input: PathBuf,

    /// The raw ETI output file
    pub output: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Usage goes to stdout, like the help text
    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            print!("{}", e.render());
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&opts) {
        Ok(summary) => {
            info!(
                kept = summary.frames_kept,
                dropped = summary.frames_dropped,
                "Done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(opts: &Opts) -> Result<Summary, Error> {
    let mut cfg = match opts.config.as_ref() {
        Some(path) => Config::from_yaml(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if let Some(frame_size) = opts.frame_size {
        cfg.frame_size = frame_size;
    }
    if opts.frame_header {
        cfg.fct_source = FctSource::FrameHeader;
    }

    let mut filter = Filter::new(&cfg)?;

    let input = fs::File::open(&opts.input)
        .inspect_err(|_| error!(path = %opts.input.display(), "Cannot open input"))?;
    let output = fs::File::create(&opts.output)
        .inspect_err(|_| error!(path = %opts.output.display(), "Cannot create output"))?;
    let input = BufReader::new(input);
    let output = BufWriter::new(output);

    let progress = |v: &Verdict| println!("{v}");
    let summary = match cfg.fct_source {
        FctSource::Log => filter.filter(io::stdin().lock(), input, output, progress)?,
        FctSource::FrameHeader => filter.filter_frames(input, output, progress)?,
    };

    if opts.summary {
        print!("{}", serde_yaml::to_string(&summary)?);
    }

    Ok(summary)
}
