use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use matecollate::{
    Alignment, Collator, CollatorConfig, IterSource, MateRecord, ReadRole, DEFAULT_HASH_BITS,
    DEFAULT_MAX_BUFFERED, FLAG_PAIRED, FLAG_READ1, FLAG_READ2, FLAG_SECONDARY,
};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const BASES: &[u8] = b"ACGT";

/// Collate a simulated, shuffled alignment stream into adjacent mate pairs
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// Number of complete read pairs to simulate
    #[arg(short = 'n', long = "pairs", default_value_t = 100_000)]
    pairs: usize,

    /// Number of reads whose mate is missing
    #[arg(long = "orphans", default_value_t = 100)]
    orphans: usize,

    /// Number of secondary alignments mixed into the stream
    #[arg(long = "secondary", default_value_t = 100)]
    secondary: usize,

    /// Number of unpaired fragments mixed into the stream
    #[arg(long = "fragments", default_value_t = 100)]
    fragments: usize,

    /// Slot table size as a power of two
    #[arg(long = "hash-bits", default_value_t = DEFAULT_HASH_BITS)]
    hash_bits: u32,

    /// Evicted records buffered before spilling
    #[arg(long = "max-buffered", default_value_t = DEFAULT_MAX_BUFFERED)]
    max_buffered: usize,

    /// Directory for the spill file (system temp dir by default)
    #[arg(long = "tmp-dir")]
    tmp_dir: Option<PathBuf>,

    /// Seed for the simulated stream
    #[arg(long = "seed", default_value_t = 42)]
    seed: u64,

    /// Increase logging verbosity
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_log(verbosity: usize) -> Result<()> {
    stderrlog::new()
        .module(module_path!())
        .module("matecollate")
        .quiet(false)
        .verbosity(verbosity)
        .timestamp(stderrlog::Timestamp::Off)
        .init()?;
    Ok(())
}

fn random_bases(rng: &mut SmallRng, len: usize) -> Vec<u8> {
    (0..len)
        .map(|_| BASES[rng.random_range(0..BASES.len())])
        .collect()
}

fn simulate_read(rng: &mut SmallRng, name: &str, flag: u16) -> Result<Alignment> {
    let seq = random_bases(rng, 150);
    let qual = vec![b'I'; seq.len()];
    let record = Alignment::builder()
        .name(name)
        .flag(flag)
        .reference_id(rng.random_range(-1..24))
        .pos(rng.random_range(0..1_000_000))
        .mapq(60)
        .seq(&seq)
        .qual(&qual)
        .build()?;
    Ok(record)
}

fn simulate(cli: &Cli) -> Result<Vec<Alignment>> {
    let mut rng = SmallRng::seed_from_u64(cli.seed);
    let mut records = Vec::with_capacity(2 * cli.pairs + cli.orphans + cli.secondary + cli.fragments);

    for idx in 0..cli.pairs {
        let name = format!("pair.{idx}");
        records.push(simulate_read(&mut rng, &name, FLAG_PAIRED | FLAG_READ1)?);
        records.push(simulate_read(&mut rng, &name, FLAG_PAIRED | FLAG_READ2)?);
    }
    for idx in 0..cli.orphans {
        let segment = if idx % 2 == 0 { FLAG_READ1 } else { FLAG_READ2 };
        records.push(simulate_read(&mut rng, &format!("orphan.{idx}"), FLAG_PAIRED | segment)?);
    }
    for idx in 0..cli.secondary {
        let name = format!("pair.{}", idx % cli.pairs.max(1));
        records.push(simulate_read(
            &mut rng,
            &name,
            FLAG_PAIRED | FLAG_READ1 | FLAG_SECONDARY,
        )?);
    }
    for idx in 0..cli.fragments {
        records.push(simulate_read(&mut rng, &format!("fragment.{idx}"), 0)?);
    }

    records.shuffle(&mut rng);
    Ok(records)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_log(1 + usize::from(cli.verbose))?;

    let mut config = CollatorConfig::builder()
        .hash_bits(cli.hash_bits)
        .max_buffered(cli.max_buffered);
    if let Some(ref dir) = cli.tmp_dir {
        config = config.tmp_dir(dir);
    }
    let config = config.build()?;

    let records = simulate(&cli)?;
    info!("Simulated {} records", records.len());

    let source = IterSource::new(String::from("@HD\tVN:1.6\tSO:unsorted"), records);
    let mut collator = Collator::new(source, config);
    info!("Header: {}", collator.header());

    let mut pending: Option<Alignment> = None;
    let mut adjacent = 0;
    while let Some(record) = collator.get()? {
        if let Some(prev) = pending.take() {
            if prev.name() == record.name() && record.read_role() == ReadRole::Read2 {
                if prev.read_role() != ReadRole::Read1 {
                    bail!("Mate pair emitted out of order: {:?}", prev.name());
                }
                adjacent += 1;
                continue;
            }
        }
        pending = Some(record);
    }

    let stats = collator.stats();
    if stats.records_emitted + stats.records_excluded != stats.records_read {
        bail!(
            "Record count mismatch: read {}, emitted {}, excluded {}",
            stats.records_read,
            stats.records_emitted,
            stats.records_excluded
        );
    }
    if adjacent != stats.pairs() {
        bail!(
            "Found {adjacent} adjacent pairs but {} were completed",
            stats.pairs()
        );
    }

    println!("{stats}");
    Ok(())
}
