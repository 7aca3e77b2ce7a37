use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use corpusloader::{
    config::Config,
    controller::{Controller, CorpusController},
    loader::{LoaderFactory, ValidFileType},
    models::{FileReference, LoadType},
    view::{FileLoaderWidget, ViewWrapper},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "corpusloader")]
#[command(about = "Load documents, spreadsheets and R data files into a corpus and inspect it")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported file types
    Formats,
    /// Load a single file and preview its table
    Inspect {
        /// File to load
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Load as metadata instead of corpus
        #[arg(long)]
        meta: bool,
    },
    /// Load files and build a corpus from them
    Load {
        /// Corpus files, directories or ZIP archives
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<PathBuf>,
        /// Metadata files, directories or ZIP archives
        #[arg(long, num_args = 1..)]
        meta: Vec<PathBuf>,
        /// Local RO-Crate directory whose files are added to the corpus
        #[arg(long, value_name = "CRATE_DIR")]
        oni: Option<PathBuf>,
        /// Corpus name (overrides config)
        #[arg(long)]
        name: Option<String>,
        /// Column holding document text (overrides config)
        #[arg(long)]
        text_header: Option<String>,
        /// Join metadata on CORPUS_COL=META_COL
        #[arg(long, value_name = "CORPUS_COL=META_COL")]
        link: Option<String>,
        /// Print built corpora as JSON
        #[arg(long)]
        json: bool,
    },
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn parse_link(link: &str) -> Result<(String, String)> {
    let (corpus_col, meta_col) = link
        .split_once('=')
        .ok_or_else(|| anyhow!("Link must be in format CORPUS_COL=META_COL, got: {link}"))?;
    if corpus_col.is_empty() || meta_col.is_empty() {
        bail!("Link must be in format CORPUS_COL=META_COL, got: {link}");
    }
    Ok((corpus_col.to_string(), meta_col.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration (falls back to defaults if not found)
    let config = Config::load().unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Formats => {
            for file_type in ValidFileType::ALL {
                println!("{}", file_type);
            }
        }
        Commands::Inspect { file, meta } => {
            let file_ref = FileReference::from_path(&file);
            let load_type = if meta { LoadType::Meta } else { LoadType::Corpus };
            let loader = LoaderFactory::get_file_loader(&file_ref)?;

            let pb = spinner(&format!("Loading {}", file_ref.filename()))?;
            let table = loader.load(load_type).await;
            pb.finish_and_clear();
            let table = table.with_context(|| format!("Failed to load {}", file.display()))?;

            println!("{} ({} rows, loaded as {})", file_ref.filename(), table.len(), load_type);
            println!("{}", table.preview(config.display.preview_rows));
        }
        Commands::Load {
            paths,
            meta,
            oni,
            name,
            text_header,
            link,
            json,
        } => {
            let mut controller = CorpusController::new(config.loader.clone());
            if let Some(header) = text_header {
                controller.set_text_header(header);
            }
            if let Some(link) = link {
                let (corpus_col, meta_col) = parse_link(&link)?;
                controller.set_link_headers(Some(corpus_col), Some(meta_col));
            }
            let mut wrapper = ViewWrapper::new(controller);

            let mut corpus_files = FileLoaderWidget::collect_file_refs(&paths)?;
            if let Some(dir) = oni {
                let opened = wrapper.oni_loader_mut().open_crate(&dir)?;
                corpus_files.extend(opened.files.iter().cloned());
            }
            let meta_files = FileLoaderWidget::collect_file_refs(&meta)?;
            let corpus_name = name.unwrap_or_else(|| config.corpus.default_name.clone());

            let pb = spinner(&format!("Loading {} corpus files", corpus_files.len()))?;
            let loaded = wrapper.load_corpus_from_filepaths(&corpus_files).await
                && (meta_files.is_empty() || wrapper.load_meta_from_filepaths(&meta_files).await)
                && wrapper.build_corpus(&corpus_name).await;
            pb.finish_and_clear();

            if !loaded {
                let message = wrapper
                    .controller()
                    .last_error()
                    .unwrap_or("unknown error")
                    .to_string();
                bail!(message);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(wrapper.controller().corpora())?);
            } else {
                println!("{}", wrapper.render());
            }
        }
    }

    Ok(())
}
