//! Builder for `SearchSubtitles` records

use subtitle_proxy_core::protocol::Value;

/// Builder for one record of a `SearchSubtitles` response
///
/// Members are strings, as the server sends them.
pub struct SearchRecordBuilder {
    file_id: String,
    language: String,
    file_name: String,
    movie_name: String,
    movie_year: String,
    imdb_id: String,
    hearing_impaired: bool,
    downloads: u64,
    rating: String,
    size: u64,
}

impl SearchRecordBuilder {
    pub fn new(file_id: &str) -> Self {
        Self {
            file_id: file_id.to_string(),
            language: "eng".to_string(),
            file_name: format!("Titanic.1997.{file_id}.srt"),
            movie_name: "Titanic".to_string(),
            movie_year: "1997".to_string(),
            imdb_id: "120338".to_string(),
            hearing_impaired: false,
            downloads: 1000,
            rating: "0.0".to_string(),
            size: 120_000,
        }
    }

    /// Set the three-letter language id
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_file_name(mut self, file_name: &str) -> Self {
        self.file_name = file_name.to_string();
        self
    }

    pub fn with_movie(mut self, name: &str, year: u32) -> Self {
        self.movie_name = name.to_string();
        self.movie_year = year.to_string();
        self
    }

    /// Set the IMDb id without the `tt` prefix
    pub fn with_imdb_id(mut self, imdb_id: &str) -> Self {
        self.imdb_id = imdb_id.to_string();
        self
    }

    pub fn hearing_impaired(mut self) -> Self {
        self.hearing_impaired = true;
        self
    }

    pub fn with_downloads(mut self, downloads: u64) -> Self {
        self.downloads = downloads;
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = format!("{rating:.1}");
        self
    }

    pub fn build(self) -> Value {
        let download_link = format!(
            "https://dl.opensubtitles.org/en/download/src-api/vrf-19a30c5e/filead/{}.gz",
            self.file_id
        );
        Value::structure([
            ("IDSubtitleFile", Value::from(self.file_id)),
            ("SubLanguageID", Value::from(self.language)),
            ("SubFileName", Value::from(self.file_name)),
            ("MovieName", Value::from(self.movie_name)),
            ("MovieYear", Value::from(self.movie_year)),
            ("IDMovieImdb", Value::from(self.imdb_id)),
            (
                "SubHearingImpaired",
                Value::from(if self.hearing_impaired { "1" } else { "0" }),
            ),
            ("SubDownloadsCnt", Value::from(self.downloads.to_string())),
            ("SubRating", Value::from(self.rating)),
            ("SubSize", Value::from(self.size.to_string())),
            ("SubEncoding", Value::from("UTF-8")),
            ("SubFormat", Value::from("srt")),
            ("SubDownloadLink", Value::from(download_link)),
        ])
    }
}
