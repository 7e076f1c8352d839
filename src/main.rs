//! Poly Saboteur: search, submit and verify answers to study questions.

mod error;
mod matcher;
mod records;
mod search;
mod similarity;
mod subjects;
mod tokenize;
mod websearch;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{check_threshold, Result};
use crate::records::QaRecord;
use crate::subjects::Catalogue;

const DEFAULT_DATA_PATH: &str = "subjects.json";

#[derive(Parser)]
#[command(name = "poly-saboteur")]
#[command(about = "Typo-tolerant search over question/answer databases")]
struct Cli {
    /// Subject catalogue file.
    #[arg(long, short, global = true, env = "POLY_DATA", default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Minimum word similarity for fuzzy matches, in [0, 1].
    #[arg(long, global = true, env = "POLY_MIN_SIMILARITY", default_value_t = matcher::DEFAULT_MIN_SIMILARITY)]
    min_similarity: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the catalogue and start the HTTP API.
    Serve {
        /// Port to listen on.
        #[arg(long, short, env = "POLY_PORT", default_value_t = 3000)]
        port: u16,
    },

    /// Search answers and print the matches as JSON.
    Search {
        /// Search query.
        #[arg(long, short)]
        query: String,

        /// Restrict to one subject.
        #[arg(long, short)]
        subject: Option<u64>,

        /// Search an import file instead of the catalogue.
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Max results.
        #[arg(long, short = 'n', default_value_t = records::DISPLAY_LIMIT)]
        limit: usize,
    },

    /// Merge an import file into a subject and save the catalogue.
    Import {
        /// Import file: [{"question": "...", "answer": "..."}, ...]
        #[arg(long, short)]
        file: PathBuf,

        /// Target subject id.
        #[arg(long, short)]
        subject: u64,

        /// Subject name, used when the subject does not exist yet.
        #[arg(long)]
        name: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let min_similarity = check_threshold(cli.min_similarity)?;
    match cli.command {
        Command::Serve { port } => run_serve(&cli.data, port, min_similarity)?,
        Command::Search { query, subject, file, limit } => {
            run_search(&cli.data, &query, subject, file.as_deref(), limit, min_similarity)?;
        }
        Command::Import { file, subject, name } => {
            run_import(&cli.data, &file, subject, &name)?;
        }
    }
    Ok(())
}

fn load_import(path: &Path) -> Result<Vec<QaRecord>> {
    let json = fs::read_to_string(path)?;
    records::parse_import(&json)
}

fn run_search(
    data_path: &Path,
    query: &str,
    subject: Option<u64>,
    file: Option<&Path>,
    limit: usize,
    min_similarity: f64,
) -> Result<()> {
    let catalogue;
    let imported;
    let source: Vec<&QaRecord> = match (file, subject) {
        (Some(path), _) => {
            imported = load_import(path)?;
            imported.iter().collect()
        }
        (None, Some(id)) => {
            catalogue = Catalogue::load(data_path)?;
            catalogue.get(id)?.answers.iter().collect()
        }
        (None, None) => {
            catalogue = Catalogue::load(data_path)?;
            catalogue.subjects().iter().flat_map(|s| &s.answers).collect()
        }
    };

    let hits = records::filter_records(source, query, min_similarity);
    let page = records::paginate(hits, limit);
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

fn run_import(data_path: &Path, file: &Path, subject_id: u64, name: &str) -> Result<()> {
    let imported = load_import(file)?;
    let mut catalogue = Catalogue::load_or_default(data_path)?;

    let subject = catalogue.get_or_insert(subject_id, name);
    let count = imported.len();
    subject.answers.extend(imported);
    let total = subject.questions_count();

    catalogue.save(data_path)?;
    info!(subject_id, count, total, "import merged");
    println!("Imported {count} answers into subject {subject_id} ({total} total)");
    Ok(())
}

fn run_serve(data_path: &Path, port: u16, min_similarity: f64) -> Result<()> {
    let catalogue = Catalogue::load_or_default(data_path)?;
    let state = search::AppState::new(catalogue, data_path.to_path_buf(), min_similarity);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let app = search::router(state);

        let addr = format!("127.0.0.1:{}", port);
        info!("Listening on http://{}", addr);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;
        Ok::<(), error::AppError>(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_requires_subject_name() {
        let missing = Cli::try_parse_from(["poly-saboteur", "import", "-f", "in.json", "-s", "7"]);
        assert!(missing.is_err());

        let cli = Cli::try_parse_from([
            "poly-saboteur", "import", "-f", "in.json", "-s", "7", "--name", "Химия",
        ])
        .unwrap();
        match cli.command {
            Command::Import { subject, name, .. } => {
                assert_eq!(subject, 7);
                assert_eq!(name, "Химия");
            }
            _ => panic!("expected import"),
        }
    }
}
