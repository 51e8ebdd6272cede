//! Core value types: ratings, recommendations, movies and the genre vocabulary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User identifier (MovieLens ids and chat user ids both fit)
pub type UserId = i64;

/// Item key: the normalized movie title
pub type ItemId = String;

/// One user's opinion of one item
///
/// Duplicate `(user_id, item_id)` pairs overwrite each other when loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub score: f64,
}

impl Rating {
    pub fn new(user_id: UserId, item_id: impl Into<ItemId>, score: f64) -> Self {
        Self {
            user_id,
            item_id: item_id.into(),
            score,
        }
    }
}

/// Ranked output of every query
///
/// `score` is a predicted rating, a similarity coefficient or an average
/// rating depending on the query that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: ItemId,
    pub score: f64,
}

impl Recommendation {
    pub fn new(item_id: impl Into<ItemId>, score: f64) -> Self {
        Self {
            item_id: item_id.into(),
            score,
        }
    }
}

/// Fixed MovieLens genre vocabulary, in file column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Genre {
    Unknown,
    Action,
    Adventure,
    Animation,
    Children,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Fantasy,
    FilmNoir,
    Horror,
    Musical,
    Mystery,
    Romance,
    SciFi,
    Thriller,
    War,
    Western,
}

/// Number of genre flag columns in an item row
pub const N_GENRES: usize = 19;

impl Genre {
    pub const ALL: [Genre; N_GENRES] = [
        Genre::Unknown,
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Children,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Fantasy,
        Genre::FilmNoir,
        Genre::Horror,
        Genre::Musical,
        Genre::Mystery,
        Genre::Romance,
        Genre::SciFi,
        Genre::Thriller,
        Genre::War,
        Genre::Western,
    ];

    /// Display name as spelled in the dataset
    pub fn name(self) -> &'static str {
        match self {
            Genre::Unknown => "unknown",
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Children => "Children's",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Fantasy => "Fantasy",
            Genre::FilmNoir => "Film-Noir",
            Genre::Horror => "Horror",
            Genre::Musical => "Musical",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::SciFi => "Sci-Fi",
            Genre::Thriller => "Thriller",
            Genre::War => "War",
            Genre::Western => "Western",
        }
    }

    /// Case-insensitive exact match against the vocabulary
    pub fn from_name(name: &str) -> Option<Genre> {
        let needle = name.trim();
        Genre::ALL
            .iter()
            .copied()
            .find(|g| g.name().eq_ignore_ascii_case(needle))
    }

    /// Column position of the flag within the genre block
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::from_name(s).ok_or_else(|| format!("unknown genre: {s}"))
    }
}

/// Movie metadata record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// Numeric id from the item file
    pub movie_id: u32,
    pub title: String,
    /// Raw title with `(YYYY)` removed, original casing
    pub title_no_year: String,
    pub release_date: String,
    /// Four-digit year from the release date, `"0000"` when absent
    pub year: String,
    /// Canonical lookup and join key
    pub normalized_title: String,
    pub imdb_url: String,
    /// Flagged genres in vocabulary order
    pub genres: Vec<Genre>,
}

impl Movie {
    pub fn has_genre(&self, genre: Genre) -> bool {
        self.genres.contains(&genre)
    }

    /// Number of genres shared with another movie
    pub fn shared_genres(&self, other: &Movie) -> usize {
        self.genres.iter().filter(|g| other.has_genre(**g)).count()
    }
}
