use anyhow::Result;
use clap::{Parser, Subcommand};
use elixir_indexer::{
    config::Settings,
    constants::VERSION,
    family::Family,
    query::Query,
    repo::Repo,
    store::XrefStore,
    update::{self, UpdateConfig},
    validate,
};
use log::LevelFilter;
use std::sync::Arc;
use stderrlog::{ColorChoice, Timestamp};

#[derive(Parser, Debug)]
#[command(name = "elixir-indexer", author, version = VERSION, about, long_about = Some("Elixir Indexer\n\n\
Index and query identifiers across every tagged revision of a source tree"))]
struct Cli {
    #[command(subcommand)]
    command: IndexerCommand,

    /// Log level
    #[arg(long, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
enum IndexerCommand {
    /// Index every tag not yet present in the database
    Update {
        /// Worker threads per parsing stage [default: all cores]
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Print database statistics
    Stats,

    /// Print the indexed versions
    Versions,

    /// Print definitions, references and doc-comments of an identifier
    Ident {
        version: String,
        ident: String,
        /// File family: A, B, C, D, K or M
        family: String,
    },

    /// Print a source file with known identifiers marked
    File {
        version: String,
        path: String,
    },

    /// Complete an identifier prefix
    Autocomplete {
        prefix: String,
        /// File family: A, B, C, D, K or M
        #[arg(default_value = "C")]
        family: String,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    stderrlog::new()
        .module(module_path!())
        .color(ColorChoice::Never)
        .timestamp(Timestamp::Microsecond)
        .verbosity(if matches!(args.command, IndexerCommand::Update { .. }) {
            args.log_level.max(LevelFilter::Info)
        } else {
            args.log_level
        })
        .init()
        .unwrap();

    let settings = Settings::from_env()?;
    match args.command {
        IndexerCommand::Update { workers } => {
            let repo = Repo::from_settings(&settings);
            let store = Arc::new(XrefStore::new(&settings.data_dir)?);
            let mut config = UpdateConfig {
                dts_comp: repo.dts_comp()?,
                ..Default::default()
            };
            if let Some(workers) = workers {
                config.workers = workers;
            }
            update::run(store, &repo, &config)
        }

        IndexerCommand::Stats => {
            let query = Query::open(&settings)?;
            let stats = query.stats();
            println!("Versions: {}", stats.versions);
            println!("Blobs: {}", stats.blobs);
            if stats.blobs != stats.hashes || stats.hashes != stats.filenames {
                println!("Warning, number of blobs, hashes or files is not equal");
            }
            println!("Definitions: {}", stats.definitions);
            println!("References: {}", stats.references);
            Ok(())
        }

        IndexerCommand::Versions => {
            let query = Query::open(&settings)?;
            for line in query.versions()? {
                println!("{}", line.tag);
            }
            Ok(())
        }

        IndexerCommand::Ident {
            version,
            ident,
            family,
        } => {
            validate::version(&version)?;
            validate::ident(&ident)?;
            let family = Family::parse(&family)?;
            let query = Query::open(&settings)?;
            let results = query.search_ident(&version, &ident, family)?;

            println!("Symbol Definitions:");
            for def in &results.definitions {
                println!("{def}");
            }
            println!("\nSymbol References:");
            for reference in &results.references {
                println!("{reference}");
            }
            println!("\nDocumented in:");
            for doc in &results.doc_comments {
                println!("{doc}");
            }
            Ok(())
        }

        IndexerCommand::File { version, path } => {
            validate::version(&version)?;
            validate::path(&path)?;
            let query = Query::open(&settings)?;
            let content = query.get_tokenized_file(&version, &path)?;
            use std::io::Write;
            std::io::stdout().write_all(&content)?;
            Ok(())
        }

        IndexerCommand::Autocomplete { prefix, family } => {
            validate::ident(&prefix)?;
            let family = Family::parse(&family)?;
            let query = Query::open(&settings)?;
            for ident in query.autocomplete(&prefix, family)? {
                println!("{ident}");
            }
            Ok(())
        }
    }
}
