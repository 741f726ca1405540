use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, Level};
use simple_logger::init_with_level;

use gtf_novel_blocks::{Block, CatalogBuilder, CatalogKeys, ExonCatalog, DEFAULT_MIN_CLIP};

/// Build exon catalogs from GTF/GFF3 annotation and classify aligned
/// contig blocks as novel or known.
#[derive(Parser, Debug)]
#[command(name = "novel-blocks")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the exon coordinate table of a GTF/GFF3 annotation as BED
    ExonBed(ExonBedArgs),

    /// Build an exon catalog from a GTF/GFF3 annotation and write it to disk
    Build(BuildArgs),

    /// Classify candidate blocks against an exon catalog or annotation
    Classify(ClassifyArgs),

    /// Load a catalog from disk and print summary stats
    Stats(StatsArgs),
}

/// Attribute-key options shared by every command that parses annotation.
#[derive(Args, Debug)]
struct KeyArgs {
    /// Attribute keys to use for gene ID (repeatable).
    #[arg(
        long = "gene-id-key",
        value_name = "KEY",
        num_args = 1..,
        default_values_t = vec!["gene_id".to_string()]
    )]
    gene_id_keys: Vec<String>,

    /// Attribute keys to use for gene name (repeatable).
    #[arg(
        long = "gene-name-key",
        value_name = "KEY",
        num_args = 1..,
        default_values_t = vec!["gene_name".to_string()]
    )]
    gene_name_keys: Vec<String>,

    /// Attribute keys to use for the exon number label (repeatable).
    #[arg(
        long = "exon-number-key",
        value_name = "KEY",
        num_args = 1..,
        default_values_t = vec!["exon_number".to_string()]
    )]
    exon_number_keys: Vec<String>,

    /// Feature types that count as exon blocks (repeatable).
    #[arg(
        long = "exon-feature-type",
        value_name = "TYPE",
        num_args = 1..,
        default_values_t = vec!["exon".to_string()]
    )]
    exon_feature_types: Vec<String>,
}

impl From<KeyArgs> for CatalogKeys {
    fn from(args: KeyArgs) -> Self {
        CatalogKeys {
            gene_id_keys: args.gene_id_keys,
            gene_name_keys: args.gene_name_keys,
            exon_number_keys: args.exon_number_keys,
            exon_feature_types: args.exon_feature_types,
        }
    }
}

#[derive(Args, Debug)]
struct ExonBedArgs {
    /// Input annotation file (.gtf/.gff/.gff3, optionally .gz)
    #[arg(long, short)]
    annotation: PathBuf,

    /// Output BED file of exonic coordinates (stdout if omitted)
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Bin width in base pairs
    #[arg(long, short, default_value_t = 1_000_000)]
    bin_width: u32,

    #[command(flatten)]
    keys: KeyArgs,
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Input annotation file (.gtf/.gff/.gff3, optionally .gz)
    #[arg(long, short)]
    annotation: PathBuf,

    /// Output serialized catalog file
    #[arg(long, short)]
    catalog: PathBuf,

    /// Bin width in base pairs
    #[arg(long, short, default_value_t = 1_000_000)]
    bin_width: u32,

    #[command(flatten)]
    keys: KeyArgs,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// Serialized catalog file (alternative to --annotation)
    #[arg(long, short, conflicts_with = "annotation")]
    catalog: Option<PathBuf>,

    /// Annotation file to build the catalog from on the fly
    #[arg(long, short)]
    annotation: Option<PathBuf>,

    /// Candidate blocks, TSV: chrom <TAB> start <TAB> end [<TAB> name]
    /// (0-based, half-open)
    #[arg(long)]
    blocks: PathBuf,

    /// Maximum tolerated overhang in bp; overhang at or above this is novel
    #[arg(long, default_value_t = DEFAULT_MIN_CLIP)]
    min_clip: u32,

    /// Output TSV (stdout if omitted)
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Bin width in base pairs (only used with --annotation)
    #[arg(long, short, default_value_t = 1_000_000)]
    bin_width: u32,

    #[command(flatten)]
    keys: KeyArgs,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Serialized catalog file
    #[arg(long, short)]
    catalog: PathBuf,
}

fn main() -> Result<()> {
    let start = std::time::Instant::now();
    init_with_level(Level::Info)?;

    let cli = Cli::parse();

    match cli.cmd {
        Command::ExonBed(args) => {
            let catalog = CatalogBuilder::with_keys(args.bin_width, args.keys.into())
                .build_from_path(&args.annotation)
                .with_context(|| format!("building catalog from {}", args.annotation.display()))?;

            let mut out = open_output(args.out.as_deref())?;
            catalog.to_bed(&mut out)?;
            out.flush()?;

            info!("{} genes written as exon BED", catalog.genes.len());
        }

        Command::Build(args) => {
            let catalog = CatalogBuilder::with_keys(args.bin_width, args.keys.into())
                .build_from_path(&args.annotation)
                .with_context(|| format!("building catalog from {}", args.annotation.display()))?;

            println!("{catalog}");

            catalog
                .save(&args.catalog)
                .with_context(|| format!("writing catalog to {}", args.catalog.display()))?;

            info!("catalog written to {}", args.catalog.display());
        }

        Command::Classify(args) => {
            let catalog = match (&args.catalog, &args.annotation) {
                (Some(path), None) => ExonCatalog::load(path)
                    .with_context(|| format!("reading catalog {}", path.display()))?,
                (None, Some(path)) => CatalogBuilder::with_keys(args.bin_width, args.keys.into())
                    .build_from_path(path)
                    .with_context(|| format!("building catalog from {}", path.display()))?,
                _ => bail!("exactly one of --catalog or --annotation is required"),
            };

            let mut out = open_output(args.out.as_deref())?;
            let n = classify_blocks(&catalog, &args.blocks, args.min_clip, &mut out)?;
            out.flush()?;

            info!("{n} blocks classified (min_clip={})", args.min_clip);
        }

        Command::Stats(args) => {
            let catalog = ExonCatalog::load(&args.catalog)
                .with_context(|| format!("reading catalog {}", args.catalog.display()))?;
            println!("{catalog}");
        }
    }

    info!("elapsed time: {:.3?}", start.elapsed());
    Ok(())
}

fn open_output(path: Option<&std::path::Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => {
            let f = File::create(p).with_context(|| format!("create output {}", p.display()))?;
            Box::new(BufWriter::new(f))
        }
        None => Box::new(BufWriter::new(std::io::stdout())),
    })
}

/// Classify each line of a blocks TSV and write:
/// chrom, start, end, name, novel|known, overlapping gene names (or '.').
fn classify_blocks(
    catalog: &ExonCatalog,
    blocks: &std::path::Path,
    min_clip: u32,
    out: &mut dyn Write,
) -> Result<usize> {
    let file =
        File::open(blocks).with_context(|| format!("open blocks file {}", blocks.display()))?;

    let mut n = 0usize;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("read blocks file {}", blocks.display()))?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (chrom, block, name) = parse_block_line(line)
            .with_context(|| format!("{}:{line_no}: bad block line", blocks.display()))?;

        let chr_id = catalog.chr_id(&chrom).with_context(|| {
            format!(
                "{}:{line_no}: chromosome '{chrom}' not present in the annotation",
                blocks.display()
            )
        })?;

        let novel = catalog
            .classify(chr_id, block, min_clip)
            .with_context(|| format!("{}:{line_no}: classification failed", blocks.display()))?;

        let genes = catalog
            .genes_overlapping(chr_id, block)
            .iter()
            .filter_map(|&gid| catalog.genes[gid].primary_name())
            .collect::<Vec<_>>()
            .join(",");
        let genes = if genes.is_empty() { ".".to_string() } else { genes };

        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            chrom,
            block.start,
            block.end,
            name.as_deref().unwrap_or("."),
            if novel { "novel" } else { "known" },
            genes
        )?;
        n += 1;
    }

    Ok(n)
}

/// Parse one candidate block line: chrom <TAB> start <TAB> end [<TAB> name].
fn parse_block_line(line: &str) -> Result<(String, Block, Option<String>)> {
    let mut cols = line.split('\t');
    let chrom = cols.next().filter(|c| !c.is_empty()).context("missing chrom column")?;
    let start: u32 = cols
        .next()
        .context("missing start column")?
        .parse()
        .context("start is not an integer")?;
    let end: u32 = cols
        .next()
        .context("missing end column")?
        .parse()
        .context("end is not an integer")?;
    if start >= end {
        bail!("start {start} >= end {end}");
    }
    let name = cols.next().map(|s| s.to_string());

    Ok((chrom.to_string(), Block::new(start, end), name))
}
