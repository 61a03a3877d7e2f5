//! cinefile CLI
//!
//! Inspect and edit the persisted movie collections from a shell. Movie
//! records are passed as catalog JSON; results are printed as JSON.

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use cinefile_core::{LibraryConfig, MovieId, MovieLibrary};

#[derive(Parser)]
#[command(name = "cinefile", about = "Favorites, watch history, ratings and reviews", version)]
struct Cli {
    /// Data directory (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage favorites
    #[command(subcommand)]
    Favorites(FavoritesCmd),
    /// Manage watch history
    #[command(subcommand)]
    History(HistoryCmd),
    /// Manage ratings
    #[command(subcommand)]
    Ratings(RatingsCmd),
    /// Manage reviews
    #[command(subcommand)]
    Reviews(ReviewsCmd),
}

#[derive(Subcommand)]
enum FavoritesCmd {
    /// List favorites in insertion order
    List,
    /// Add a movie (JSON record, or `-` to read stdin)
    Add { movie: String },
    /// Remove a movie by id
    Remove { id: MovieId },
    /// Print whether a movie is a favorite
    Contains { id: MovieId },
}

#[derive(Subcommand)]
enum HistoryCmd {
    /// Most recently viewed movies
    List {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Record a view (JSON record, or `-` to read stdin)
    Record { movie: String },
    /// Remove a movie from history
    Forget { id: MovieId },
    /// Remove all history
    Clear,
}

#[derive(Subcommand)]
enum RatingsCmd {
    /// All ratings
    List,
    /// Rating for one movie (0 when unrated)
    Get { id: MovieId },
    /// Set a rating
    Set { id: MovieId, rating: f64 },
    /// Delete a rating
    Remove { id: MovieId },
}

#[derive(Subcommand)]
enum ReviewsCmd {
    /// Reviews for one movie, newest first
    List { id: MovieId },
    /// Add a review
    Add { id: MovieId, text: String },
    /// Remove a review
    Remove { id: MovieId, review_id: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CINEFILE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => LibraryConfig::load_file(path)?,
        None => LibraryConfig::load_standard()?,
    };
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir;
    }

    let mut library = MovieLibrary::open_default(&config)?;

    match cli.command {
        Command::Favorites(cmd) => match cmd {
            FavoritesCmd::List => print_json(library.favorites.all()),
            FavoritesCmd::Add { movie } => {
                let added = library.favorites.add(read_movie(&movie)?)?;
                print_json(&serde_json::json!({ "added": added }))
            }
            FavoritesCmd::Remove { id } => {
                print_json(&serde_json::json!({ "removed": library.favorites.remove(id) }))
            }
            FavoritesCmd::Contains { id } => print_json(&library.favorites.contains(id)),
        },
        Command::History(cmd) => match cmd {
            HistoryCmd::List { limit } => match limit {
                Some(limit) => print_json(library.history.recent(limit)),
                None => print_json(library.history.recent_default()),
            },
            HistoryCmd::Record { movie } => {
                print_json(&library.history.record(read_movie(&movie)?)?)
            }
            HistoryCmd::Forget { id } => {
                print_json(&serde_json::json!({ "removed": library.history.forget(id) }))
            }
            HistoryCmd::Clear => {
                print_json(&serde_json::json!({ "cleared": library.history.clear() }))
            }
        },
        Command::Ratings(cmd) => match cmd {
            RatingsCmd::List => print_json(library.ratings.all()),
            RatingsCmd::Get { id } => print_json(&library.ratings.get_rating(id)),
            RatingsCmd::Set { id, rating } => {
                library.ratings.set_rating(id, rating)?;
                print_json(&library.ratings.get_rating(id))
            }
            RatingsCmd::Remove { id } => {
                print_json(&serde_json::json!({ "removed": library.ratings.remove_rating(id) }))
            }
        },
        Command::Reviews(cmd) => match cmd {
            ReviewsCmd::List { id } => print_json(library.reviews.get_reviews(id)),
            ReviewsCmd::Add { id, text } => print_json(&library.reviews.add_review(id, text)),
            ReviewsCmd::Remove { id, review_id } => print_json(
                &serde_json::json!({ "removed": library.reviews.remove_review(id, &review_id) }),
            ),
        },
    }?;

    // Covers load-time repairs as well as commits that failed above.
    library.sync()?;
    Ok(())
}

fn read_movie(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let text = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        arg.to_string()
    };
    Ok(serde_json::from_str(&text)?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
