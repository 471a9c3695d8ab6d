use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use headword_sims::{
    build_index, export_translations, parse_synsets, read_flat_dictionary, ArtifactStore, CancelFlag, Config,
    Engine, Result, Script, SynPairSet, TfScheme, TranslateDirection,
};

#[derive(Parser)]
#[command(name = "headword-sims", about = "Headword similarity by TF-IDF over dictionary definitions")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Artifact directory (overrides `paths.data_dir`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build vocabulary, lookup tables, matrix and similarity index
    Build {
        /// Flat dictionary, `headword<TAB>definition` per line
        dict: Option<PathBuf>,
        /// Documents per shard (0 = one block)
        #[arg(long)]
        shard_size: Option<usize>,
        /// Write one file per shard instead of embedding them
        #[arg(long)]
        on_disk_shards: bool,
        /// Term frequency scheme
        #[arg(long, value_enum)]
        tf: Option<TfArg>,
    },

    /// Top similar headwords for each query word
    Query {
        /// Read queries from this file (first token per line) instead of stdin
        #[arg(long)]
        batch: Option<PathBuf>,
        /// Number of results per query
        #[arg(short, long)]
        n: Option<usize>,
        /// Keep only candidates in this script
        #[arg(short, long, value_enum)]
        script: Option<ScriptArg>,
    },

    /// Export top candidates for every headword as CSV
    Export {
        /// Number of candidates per row
        #[arg(short, long)]
        n: Option<usize>,
        /// Translation direction; omit to export every headword unfiltered
        #[arg(short, long, value_enum)]
        translate: Option<DirectionArg>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Cross-validate declared synonym pairs against the rankings
    Synsets {
        /// Synset declaration file
        file: PathBuf,
        /// Report file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TfArg {
    Raw,
    Log,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScriptArg {
    Greek,
    Latin,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    LatinToGreek,
    GreekToLatin,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("headword_sims=info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.paths.data_dir = dir;
    }
    let store = ArtifactStore::new(&config.paths.data_dir);

    match cli.command {
        Command::Build {
            dict,
            shard_size,
            on_disk_shards,
            tf,
        } => {
            if let Some(dict) = dict {
                config.paths.dict = dict;
            }
            if let Some(n) = shard_size {
                config.index.shard_size = n;
            }
            config.index.on_disk_shards |= on_disk_shards;
            if let Some(tf) = tf {
                config.index.tf = match tf {
                    TfArg::Raw => TfScheme::Raw,
                    TfArg::Log => TfScheme::Log,
                };
            }

            info!(dict = %config.paths.dict.display(), "reading dictionary");
            let records = read_flat_dictionary(BufReader::new(File::open(&config.paths.dict)?))?;
            let built = build_index(records, &config)?;
            store.save(&built, config.index.on_disk_shards)?;
        }

        Command::Query { batch, n, script } => {
            let engine = open_engine(&store, &config)?;
            let n = n.unwrap_or(config.query.results);
            let script = script.map(|s| match s {
                ScriptArg::Greek => Script::Greek,
                ScriptArg::Latin => Script::Latin,
            });
            let stdout = io::stdout();
            let mut out = stdout.lock();
            // stdin stops at the first empty line, batch files skip them
            let interactive = batch.is_none();
            let input: Box<dyn BufRead> = match batch {
                Some(path) => Box::new(BufReader::new(File::open(path)?)),
                None => Box::new(io::stdin().lock()),
            };
            for line in input.lines() {
                let line = line?;
                let Some(word) = line.split_whitespace().next() else {
                    if interactive {
                        break;
                    }
                    continue;
                };
                match engine.query(word, n, script) {
                    Ok(outcome) => outcome.write_listing(word, &mut out)?,
                    // scoped to this query
                    Err(err) => eprintln!("query {word:?} failed: {err}"),
                }
                writeln!(out)?;
                out.flush()?;
            }
        }

        Command::Export { n, translate, output } => {
            let engine = open_engine(&store, &config)?;
            let n = n.unwrap_or(config.query.results);
            let direction = translate.map(|d| match d {
                DirectionArg::LatinToGreek => TranslateDirection::LatinToGreek,
                DirectionArg::GreekToLatin => TranslateDirection::GreekToLatin,
            });
            match output {
                Some(path) => export_translations(&engine, n, direction, BufWriter::new(File::create(path)?))?,
                None => export_translations(&engine, n, direction, io::stdout().lock())?,
            };
        }

        Command::Synsets { file, output } => {
            let engine = Engine::load(&store)?;
            let records = parse_synsets(BufReader::new(File::open(&file)?))?;
            let pairs = SynPairSet::from_records(records);
            info!(pairs = pairs.len(), "cross-referencing synsets");
            let cancel = CancelFlag::new();
            let summary = match output {
                Some(path) => engine.cross_validate(&pairs, BufWriter::new(File::create(path)?), &cancel)?,
                None => engine.cross_validate(&pairs, io::stdout().lock(), &cancel)?,
            };
            info!(?summary, "done");
        }
    }
    Ok(())
}

fn open_engine(store: &ArtifactStore, config: &Config) -> Result<Engine> {
    let engine = Engine::load(store)?;
    if config.paths.full_defs.exists() {
        engine.with_glossary_file(&config.paths.full_defs)
    } else {
        info!(path = %config.paths.full_defs.display(), "no glossary, results shown without definitions");
        Ok(engine)
    }
}
