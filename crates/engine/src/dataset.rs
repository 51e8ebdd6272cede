//! MovieLens dataset loading and title normalization
//!
//! Reads the tab-separated ratings file and the pipe-separated item file
//! (both Latin-1), derives the normalized title, display year and genre
//! flags for every movie, and precomputes per-movie average ratings.
//!
//! Malformed rows are skipped with a warning. A missing file is fatal.

use crate::config::DatasetConfig;
use crate::types::{Genre, Movie, Rating, UserId};
use cinematch_core::{CinematchError, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `(YYYY)` parenthetical inside a title
static YEAR_PAREN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\d{4}\)").expect("Failed to compile year parenthetical regex"));

/// First four-digit run in a release date
static YEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}").expect("Failed to compile year regex"));

const UNKNOWN_YEAR: &str = "0000";

/// Leading columns before the genre flags in an item row
const ITEM_FIXED_COLUMNS: usize = 5;

/// Canonical lookup key for a movie title
///
/// Lowercases, removes `(YYYY)` parentheticals and trims whitespace.
/// Empty input yields an empty string.
pub fn normalize_title(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    YEAR_PAREN_REGEX.replace_all(&lowered, "").trim().to_string()
}

/// Raw title with the year parenthetical removed, casing preserved
fn strip_year(title: &str) -> String {
    YEAR_PAREN_REGEX.replace_all(title, "").trim().to_string()
}

fn extract_year(release_date: &str) -> String {
    YEAR_REGEX
        .find(release_date)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_YEAR.to_string())
}

/// Capitalize the first letter of every word, lowercase the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = c != '\'';
        }
    }
    out
}

/// MovieLens files are Latin-1; every byte maps to the same code point.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// One row of the ratings file, before title resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRating {
    pub user_id: UserId,
    pub movie_id: u32,
    pub score: f64,
}

/// Loaded and normalized dataset
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    ratings: Vec<RawRating>,
    movies: Vec<Movie>,
    movie_index: HashMap<u32, usize>,
    average_ratings: HashMap<u32, f64>,
    display_titles: HashMap<String, String>,
    skipped_rows: usize,
}

impl Dataset {
    /// Load both dataset files
    ///
    /// # Errors
    ///
    /// `DatasetMissing` if either file does not exist, `DatasetUnreadable`
    /// or `Csv` if reading fails part-way.
    pub fn load(config: &DatasetConfig) -> Result<Self> {
        info!(path = %config.ratings_path.display(), "Loading user ratings");
        let (ratings, skipped_ratings) = parse_ratings(open_source(&config.ratings_path)?)?;

        info!(path = %config.items_path.display(), "Loading movie metadata and genres");
        let (movies, skipped_movies) = parse_movies(open_source(&config.items_path)?)?;

        let mut dataset = Self::from_parts(ratings, movies);
        dataset.skipped_rows = skipped_ratings + skipped_movies;

        info!(
            ratings = dataset.ratings.len(),
            movies = dataset.movies.len(),
            skipped_rows = dataset.skipped_rows,
            "Dataset loaded"
        );

        Ok(dataset)
    }

    /// Load from in-memory readers (same formats as the files)
    pub fn from_readers(ratings: impl Read, items: impl Read) -> Result<Self> {
        let (ratings, skipped_ratings) = parse_ratings(ratings)?;
        let (movies, skipped_movies) = parse_movies(items)?;
        let mut dataset = Self::from_parts(ratings, movies);
        dataset.skipped_rows = skipped_ratings + skipped_movies;
        Ok(dataset)
    }

    /// Build the derived tables from already parsed rows
    pub fn from_parts(ratings: Vec<RawRating>, movies: Vec<Movie>) -> Self {
        let mut movie_index = HashMap::with_capacity(movies.len());
        let mut display_titles = HashMap::with_capacity(movies.len());
        for (idx, movie) in movies.iter().enumerate() {
            movie_index.entry(movie.movie_id).or_insert(idx);
            if !movie.normalized_title.is_empty() {
                display_titles.insert(
                    movie.normalized_title.clone(),
                    format!("{} ({})", title_case(&movie.title_no_year), movie.year),
                );
            }
        }

        let mut sums: HashMap<u32, (f64, usize)> = HashMap::new();
        for rating in &ratings {
            let entry = sums.entry(rating.movie_id).or_insert((0.0, 0));
            entry.0 += rating.score;
            entry.1 += 1;
        }
        let average_ratings = sums
            .into_iter()
            .map(|(movie_id, (sum, count))| (movie_id, sum / count as f64))
            .collect();

        Self {
            ratings,
            movies,
            movie_index,
            average_ratings,
            display_titles,
            skipped_rows: 0,
        }
    }

    pub fn raw_ratings(&self) -> &[RawRating] {
        &self.ratings
    }

    /// Movies in file order
    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn movie(&self, movie_id: u32) -> Option<&Movie> {
        self.movie_index.get(&movie_id).map(|&idx| &self.movies[idx])
    }

    /// First movie (file order) with this normalized title
    pub fn movie_by_title(&self, normalized_title: &str) -> Option<&Movie> {
        self.movies
            .iter()
            .find(|m| m.normalized_title == normalized_title)
    }

    /// Mean score for a movie, `None` if nobody rated it
    pub fn average_rating(&self, movie_id: u32) -> Option<f64> {
        self.average_ratings.get(&movie_id).copied()
    }

    /// Rows skipped as malformed during parsing
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Ratings keyed by normalized title
    ///
    /// Ratings for movies missing from the item file (or with an empty
    /// title) fall back to the numeric movie id as the key.
    pub fn ratings_by_title(&self) -> Vec<Rating> {
        self.ratings
            .iter()
            .map(|raw| {
                let item_id = self
                    .movie(raw.movie_id)
                    .map(|m| m.normalized_title.as_str())
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| raw.movie_id.to_string());
                Rating::new(raw.user_id, item_id, raw.score)
            })
            .collect()
    }

    /// Substring search over normalized titles, first match in file order
    pub fn find_item_by_name(&self, query: &str) -> Option<String> {
        let needle = normalize_title(query);
        if needle.is_empty() {
            return None;
        }
        self.movies
            .iter()
            .find(|m| !m.normalized_title.is_empty() && m.normalized_title.contains(&needle))
            .map(|m| m.normalized_title.clone())
    }

    /// `"Title Cased Name (YYYY)"` for a known key, the key itself otherwise
    pub fn display_title(&self, normalized_title: &str) -> String {
        self.display_titles
            .get(normalized_title)
            .cloned()
            .unwrap_or_else(|| normalized_title.to_string())
    }

    /// Genre vocabulary in column order
    pub fn list_genres() -> &'static [Genre] {
        &Genre::ALL
    }
}

/// Parse both dataset files into a fresh `Dataset`
pub fn load_dataset(config: &DatasetConfig) -> Result<Dataset> {
    Dataset::load(config)
}

fn open_source(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(CinematchError::DatasetMissing {
            path: path.to_path_buf(),
        });
    }
    File::open(path).map_err(|source| CinematchError::DatasetUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

fn reader_with_delimiter<R: Read>(source: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(source)
}

/// Parse `user_id \t item_id \t rating \t timestamp` rows
///
/// Returns the parsed rows and the number of skipped malformed rows.
pub fn parse_ratings(source: impl Read) -> Result<(Vec<RawRating>, usize)> {
    let mut reader = reader_with_delimiter(source, b'\t');
    let mut ratings = Vec::new();
    let mut skipped = 0;

    for (line, result) in reader.byte_records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!(line = line + 1, error = %e, "Skipping unreadable rating row");
                skipped += 1;
                continue;
            }
        };

        match parse_rating_record(&record) {
            Some(rating) => ratings.push(rating),
            None => {
                warn!(line = line + 1, fields = record.len(), "Skipping malformed rating row");
                skipped += 1;
            }
        }
    }

    debug!(parsed = ratings.len(), skipped, "Parsed rating rows");
    Ok((ratings, skipped))
}

fn parse_rating_record(record: &csv::ByteRecord) -> Option<RawRating> {
    let field = |i: usize| record.get(i).map(latin1);
    let user_id = field(0)?.trim().parse::<UserId>().ok()?;
    let movie_id = field(1)?.trim().parse::<u32>().ok()?;
    let score = field(2)?.trim().parse::<f64>().ok()?;
    if !score.is_finite() {
        return None;
    }
    Some(RawRating {
        user_id,
        movie_id,
        score,
    })
}

/// Parse `id|title|release|video_release|imdb_url|flag x 19` rows
///
/// Rows with fewer than 19 flag columns are padded with unset flags.
pub fn parse_movies(source: impl Read) -> Result<(Vec<Movie>, usize)> {
    let mut reader = reader_with_delimiter(source, b'|');
    let mut movies = Vec::new();
    let mut skipped = 0;

    for (line, result) in reader.byte_records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!(line = line + 1, error = %e, "Skipping unreadable item row");
                skipped += 1;
                continue;
            }
        };

        match parse_movie_record(&record) {
            Some(movie) => movies.push(movie),
            None => {
                warn!(line = line + 1, fields = record.len(), "Skipping malformed item row");
                skipped += 1;
            }
        }
    }

    debug!(parsed = movies.len(), skipped, "Parsed item rows");
    Ok((movies, skipped))
}

fn parse_movie_record(record: &csv::ByteRecord) -> Option<Movie> {
    let field = |i: usize| record.get(i).map(latin1).unwrap_or_default();

    let movie_id = record.get(0).map(latin1)?.trim().parse::<u32>().ok()?;
    let title = field(1);
    let release_date = field(2);
    let imdb_url = field(4);

    let genres = Genre::ALL
        .iter()
        .copied()
        .filter(|genre| field(ITEM_FIXED_COLUMNS + genre.index()).trim() == "1")
        .collect::<Vec<_>>();

    let title_no_year = strip_year(&title);
    let normalized_title = normalize_title(&title_no_year);
    let year = extract_year(&release_date);

    Some(Movie {
        movie_id,
        title,
        title_no_year,
        release_date,
        year,
        normalized_title,
        imdb_url,
        genres,
    })
}

/// Lazily loaded, caller-owned dataset handle
///
/// The first `get` reads the files; later calls return the cached value
/// until `reset` is called.
pub struct DatasetCache {
    config: DatasetConfig,
    cached: RwLock<Option<Arc<Dataset>>>,
}

impl DatasetCache {
    pub fn new(config: DatasetConfig) -> Self {
        Self {
            config,
            cached: RwLock::new(None),
        }
    }

    /// Wrap an already loaded dataset (fixtures, tests)
    pub fn preloaded(config: DatasetConfig, dataset: Dataset) -> Self {
        Self {
            config,
            cached: RwLock::new(Some(Arc::new(dataset))),
        }
    }

    pub fn get(&self) -> Result<Arc<Dataset>> {
        if let Some(dataset) = self.cached.read().as_ref() {
            return Ok(Arc::clone(dataset));
        }

        let mut cached = self.cached.write();
        if let Some(dataset) = cached.as_ref() {
            return Ok(Arc::clone(dataset));
        }
        let dataset = Arc::new(Dataset::load(&self.config)?);
        *cached = Some(Arc::clone(&dataset));
        Ok(dataset)
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.read().is_some()
    }

    /// Drop the cached dataset so the next `get` re-reads the files
    pub fn reset(&self) {
        *self.cached.write() = None;
        debug!("Dataset cache reset");
    }
}
