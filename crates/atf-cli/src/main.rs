use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use atf_align::{
    BatchConfig, BatchRunner, CleaningFilter, DEFAULT_CHUNK_SIZE, FilterConfig, KeptWriter,
    PairReader, SimilarityClassifier,
};
use atf_codec::{CodecOptions, DeterminativeStyle, LineCodec, WordCodec, clean_line, validate};
use atf_mapping::MappingTable;
use atf_types::{Direction, Thresholds, WordPair};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atf")]
#[command(about = "Convert, clean and audit CDLI/ORACC transliterations")]
struct Cli {
    /// Reference mapping table (CSV, or TSV by extension); defaults to the bundled table.
    #[arg(long, global = true, env = "ATF_MAPPING_PATH")]
    mapping: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a transliteration file line by line.
    Convert {
        #[command(flatten)]
        files: LineIo,
        /// cdli-to-oracc (c2o) or oracc-to-cdli (o2c).
        #[arg(long, value_parser = parse_direction)]
        direction: Direction,
        #[command(flatten)]
        codec: CodecArgs,
        /// Fail on the first malformed word instead of copying it through.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Strip editorial markup to the comparison form.
    Clean {
        #[command(flatten)]
        files: LineIo,
    },
    /// Compare a converted file against a gold file by line label.
    Validate {
        predicted: PathBuf,
        gold: PathBuf,
        /// Print the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Drop likely misaligned pairs from a word-level corpus CSV.
    Filter {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Also write the run summary as JSON.
        #[arg(long)]
        summary: Option<PathBuf>,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        /// Substring marking a form as garbage; repeat to replace the defaults.
        #[arg(long = "garbage-token")]
        garbage_tokens: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        #[arg(long)]
        threads: Option<usize>,
        /// Stop after this many pairs.
        #[arg(long)]
        max_rows: Option<usize>,
    },
    /// Classify a single word pair and print the result as JSON.
    Classify {
        #[arg(long)]
        cdli: String,
        #[arg(long)]
        oracc: String,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
}

#[derive(Args)]
struct LineIo {
    #[arg(long)]
    input: PathBuf,
    /// Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// The first token of each line is a label copied verbatim.
    #[arg(long, default_value_t = false)]
    has_label: bool,
}

#[derive(Args)]
struct CodecArgs {
    /// braces ({d}) or marker (d⁼) determinatives in ORACC output.
    #[arg(long, value_parser = parse_style, default_value = "braces")]
    determinatives: DeterminativeStyle,
    #[arg(long, default_value_t = false)]
    keep_ellipsis: bool,
    #[arg(long, default_value_t = false)]
    strip_underscores: bool,
}

impl CodecArgs {
    fn options(&self) -> CodecOptions {
        CodecOptions {
            normalize_ellipsis: !self.keep_ellipsis,
            determinatives: self.determinatives,
            strip_underscores: self.strip_underscores,
        }
    }
}

#[derive(Args)]
struct ThresholdArgs {
    #[arg(long, default_value_t = Thresholds::default().high)]
    high: f64,
    #[arg(long, default_value_t = Thresholds::default().likely_misaligned)]
    likely_misaligned: f64,
}

impl ThresholdArgs {
    fn thresholds(&self) -> Result<Thresholds> {
        Thresholds::new(self.high, self.likely_misaligned).context("invalid thresholds")
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mapping = cli.mapping.as_deref();

    match cli.command {
        Commands::Convert {
            files,
            direction,
            codec,
            strict,
        } => {
            let words = WordCodec::with_options(load_table(mapping)?, codec.options());
            convert(&files, direction, LineCodec::new(words), strict)?;
        }
        Commands::Clean { files } => clean(&files)?,
        Commands::Validate {
            predicted,
            gold,
            json,
        } => run_validate(&predicted, &gold, json)?,
        Commands::Filter {
            input,
            output,
            summary,
            thresholds,
            garbage_tokens,
            chunk_size,
            threads,
            max_rows,
        } => {
            let mut config = FilterConfig::with_thresholds(thresholds.thresholds()?)?;
            if !garbage_tokens.is_empty() {
                config.garbage_tokens = garbage_tokens;
            }
            let filter = CleaningFilter::new(WordCodec::new(load_table(mapping)?), config);
            let batch = BatchConfig {
                chunk_size,
                threads,
                max_rows,
            };
            run_filter(&filter, batch, &input, &output, summary.as_deref())?;
        }
        Commands::Classify {
            cdli,
            oracc,
            thresholds,
        } => {
            let classifier = SimilarityClassifier::new(WordCodec::new(load_table(mapping)?));
            let pair = WordPair::new("", "", cdli, oracc);
            let result = classifier.classify(&pair, &thresholds.thresholds()?)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn load_table(path: Option<&Path>) -> Result<Arc<MappingTable>> {
    let table = match path {
        Some(path) => MappingTable::from_path(path)
            .with_context(|| format!("loading mapping table from {}", path.display()))?,
        None => MappingTable::builtin().context("loading bundled mapping table")?,
    };
    Ok(Arc::new(table))
}

fn open_lines(path: &Path) -> Result<impl Iterator<Item = io::Result<String>>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file).lines())
}

fn create_output(path: Option<&Path>) -> Result<BufWriter<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match path {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    Ok(BufWriter::new(sink))
}

fn convert(files: &LineIo, direction: Direction, codec: LineCodec, strict: bool) -> Result<()> {
    let mut out = create_output(files.output.as_deref())?;
    let mut count = 0usize;
    let mut skipped = 0usize;

    for (idx, line) in open_lines(&files.input)?.enumerate() {
        let line = line.with_context(|| format!("reading {}", files.input.display()))?;
        count += 1;
        if strict {
            let text = codec
                .convert_line(&line, direction, files.has_label)
                .with_context(|| format!("converting {} line {}", files.input.display(), idx + 1))?;
            writeln!(out, "{text}")?;
            continue;
        }
        let lossy = codec.convert_line_lossy(&line, direction, files.has_label);
        for err in &lossy.skipped {
            warn!("line {}: {err}; copied unchanged", idx + 1);
        }
        skipped += lossy.skipped.len();
        writeln!(out, "{}", lossy.text)?;
    }
    out.flush()?;
    info!("converted {count} lines ({direction}), {skipped} malformed words copied unchanged");
    Ok(())
}

fn clean(files: &LineIo) -> Result<()> {
    let mut out = create_output(files.output.as_deref())?;
    let mut count = 0usize;
    for line in open_lines(&files.input)? {
        let line = line.with_context(|| format!("reading {}", files.input.display()))?;
        writeln!(out, "{}", clean_line(&line, files.has_label))?;
        count += 1;
    }
    out.flush()?;
    info!("cleaned {count} lines");
    Ok(())
}

fn run_validate(predicted: &Path, gold: &Path, json: bool) -> Result<()> {
    let read = |path: &Path| {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    };
    let predicted = read(predicted)?;
    let gold = read(gold)?;
    let report = validate(predicted.lines(), gold.lines());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{:<25} | {:<10}", "Label", "Status");
    println!("{}", "-".repeat(40));
    for mismatch in &report.mismatches {
        match mismatch {
            atf_codec::Mismatch::Different {
                label,
                predicted,
                gold,
            } => println!("Mismatch on line {label}: <{predicted}> <{gold}>"),
            atf_codec::Mismatch::Missing { label, gold } => {
                println!("Mismatch on line {label}: <MISSING> <{gold}>")
            }
        }
    }
    for extra in &report.extras {
        println!(
            "Extra line in predicted {}: <{}> <HIDDEN>",
            extra.label, extra.predicted
        );
    }
    match report.match_rate() {
        Some(rate) => println!(
            "\nFinal Accuracy: {:.2}% ({}/{} matches)",
            rate * 100.0,
            report.matched,
            report.total
        ),
        None => bail!("no gold lines found; expected '<label> <text>' lines"),
    }
    Ok(())
}

fn run_filter(
    filter: &CleaningFilter,
    batch: BatchConfig,
    input: &Path,
    output: &Path,
    summary_path: Option<&Path>,
) -> Result<()> {
    let reader =
        PairReader::open(input).with_context(|| format!("opening corpus {}", input.display()))?;
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = KeptWriter::new(BufWriter::new(file))?;

    let summary = BatchRunner::new(filter, batch)
        .run(reader, |kept| writer.write(&kept))
        .with_context(|| format!("filtering {}", input.display()))?;
    writer.into_inner()?.flush()?;

    let counts = &summary.counts;
    info!(
        "kept {} of {} pairs; dropped {} (garbage {}, malformed {}); skipped {} rows with empty columns",
        counts.kept,
        counts.total,
        counts.dropped(),
        counts.garbage,
        counts.malformed,
        summary.empty_column
    );
    for (label, n) in &counts.by_label {
        info!("  {label}: {n}");
    }

    if let Some(path) = summary_path {
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn parse_direction(raw: &str) -> Result<Direction, String> {
    Direction::from_name(raw).ok_or_else(|| format!("unknown direction {raw:?}"))
}

fn parse_style(raw: &str) -> Result<DeterminativeStyle, String> {
    match raw.to_ascii_lowercase().as_str() {
        "braces" => Ok(DeterminativeStyle::Braces),
        "marker" => Ok(DeterminativeStyle::Marker),
        _ => Err(format!("unknown determinative style {raw:?}")),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}
