use crate::models::{Category, Channel};

const MOVIE_KEYWORDS: &[&str] = &["filme", "movie", "cinema", "film"];
const SERIES_KEYWORDS: &[&str] = &["série", "serie", "series", "season", "temporada"];
const SPORTS_KEYWORDS: &[&str] = &["futebol", "sport", "sports", "esporte", "futbol", "soccer"];

const EXCLUDE_KEYWORDS: &[&str] = &[
    "filme",
    "movie",
    "cinema",
    "film",
    "série",
    "serie",
    "series",
    "season",
    "temporada",
    "episódio",
    "episodio",
    "mp4",
    "vod",
    "video on demand",
    "on demand",
];

/// Direct-file markers: a stream pointing at a container file is VOD, not live
const DIRECT_FILE_MARKERS: &[&str] = &[".mp4", "type=mp4", ".mkv", ".avi", ".mov", ".flv", ".webm"];

/// Keywords for one category
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

/// Keyword data driving classification and exclusion.
///
/// Rules are tested in order and the first rule with a matching keyword wins.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    pub rules: Vec<CategoryRule>,
    pub exclusions: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            rules: vec![
                CategoryRule {
                    category: Category::Movie,
                    keywords: owned(MOVIE_KEYWORDS),
                },
                CategoryRule {
                    category: Category::Series,
                    keywords: owned(SERIES_KEYWORDS),
                },
                CategoryRule {
                    category: Category::Sports,
                    keywords: owned(SPORTS_KEYWORDS),
                },
            ],
            exclusions: EXCLUDE_KEYWORDS
                .iter()
                .chain(DIRECT_FILE_MARKERS)
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

impl KeywordTable {
    /// Replace the keyword list of `category`, keeping its precedence slot
    pub fn with_keywords(mut self, category: Category, keywords: Vec<String>) -> Self {
        match self.rules.iter_mut().find(|r| r.category == category) {
            Some(rule) => rule.keywords = keywords,
            None => self.rules.push(CategoryRule { category, keywords }),
        }
        self
    }

    /// Replace the exclusion list. Direct-file markers are always kept.
    pub fn with_exclusions(mut self, keywords: Vec<String>) -> Self {
        self.exclusions = keywords;
        for marker in DIRECT_FILE_MARKERS {
            if !self.exclusions.iter().any(|k| k == marker) {
                self.exclusions.push(marker.to_string());
            }
        }
        self
    }
}

/// Heuristic content classifier for playlist channels.
///
/// Stateless apart from its keyword table; false positives are expected.
#[derive(Debug, Clone)]
pub struct ContentClassifier {
    rules: Vec<CategoryRule>,
    exclusions: Vec<String>,
}

impl Default for ContentClassifier {
    fn default() -> Self {
        Self::new(KeywordTable::default())
    }
}

impl ContentClassifier {
    pub fn new(table: KeywordTable) -> Self {
        let lower = |words: Vec<String>| -> Vec<String> {
            words
                .into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };

        Self {
            rules: table
                .rules
                .into_iter()
                .map(|rule| CategoryRule {
                    category: rule.category,
                    keywords: lower(rule.keywords),
                })
                .collect(),
            exclusions: lower(table.exclusions),
        }
    }

    /// Category of a channel from its name and group; `Live` when nothing matches
    pub fn classify(&self, channel: &Channel) -> Category {
        let name = channel.name.to_lowercase();
        let group = channel.group.to_lowercase();

        self.rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|k| name.contains(k.as_str()) || group.contains(k.as_str()))
            })
            .map(|rule| rule.category)
            .unwrap_or(Category::Live)
    }

    /// Whether the channel is dropped from the channels-only view
    pub fn exclude(&self, channel: &Channel) -> bool {
        let fields = [
            channel.name.to_lowercase(),
            channel.group.to_lowercase(),
            channel.url.to_lowercase(),
        ];

        self.exclusions
            .iter()
            .any(|k| fields.iter().any(|field| field.contains(k.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(name: &str, group: &str, url: &str) -> Channel {
        Channel {
            name: name.to_string(),
            group: group.to_string(),
            logo: None,
            url: url.to_string(),
        }
    }

    #[test]
    fn test_classify_by_keyword() {
        let classifier = ContentClassifier::default();
        assert_eq!(classifier.classify(&ch("Matrix", "Filmes", "http://x/1")), Category::Movie);
        assert_eq!(classifier.classify(&ch("Dark", "Séries Netflix", "http://x/2")), Category::Series);
        assert_eq!(classifier.classify(&ch("ESPN", "Esportes", "http://x/3")), Category::Sports);
        assert_eq!(classifier.classify(&ch("Globo HD", "Canais", "http://x/4")), Category::Live);
    }

    #[test]
    fn test_movie_wins_over_series() {
        let classifier = ContentClassifier::default();
        let channel = ch("Movie Night Season 2", "Mixed", "http://x/1");
        assert_eq!(classifier.classify(&channel), Category::Movie);
    }

    #[test]
    fn test_classify_ignores_url() {
        let classifier = ContentClassifier::default();
        assert_eq!(classifier.classify(&ch("News", "TV", "http://x/movie/1.ts")), Category::Live);
    }

    #[test]
    fn test_exclude_by_extension() {
        let classifier = ContentClassifier::default();
        assert!(classifier.exclude(&ch("Canal", "TV", "http://x/stream.mp4")));
        assert!(classifier.exclude(&ch("Canal", "TV", "http://x/get?type=mp4")));
        assert!(classifier.exclude(&ch("Canal", "TV", "http://x/a.MKV")));
        assert!(!classifier.exclude(&ch("Canal", "TV", "http://x/live/1.ts")));
    }

    #[test]
    fn test_exclude_by_keyword() {
        let classifier = ContentClassifier::default();
        assert!(classifier.exclude(&ch("Breaking Bad Episódio 1", "TV", "http://x/1")));
        assert!(classifier.exclude(&ch("Canal", "VOD Premium", "http://x/2")));
        assert!(!classifier.exclude(&ch("Globo", "Canais", "http://x/3")));
    }

    #[test]
    fn test_custom_keyword_table() {
        let table = KeywordTable::default()
            .with_keywords(Category::Sports, vec!["ESPN".to_string()])
            .with_exclusions(vec!["adult".to_string()]);
        let classifier = ContentClassifier::new(table);

        assert_eq!(classifier.classify(&ch("ESPN 2", "TV", "http://x/1")), Category::Sports);
        assert_eq!(classifier.classify(&ch("Futebol", "TV", "http://x/2")), Category::Live);
        assert!(classifier.exclude(&ch("Adult Swim", "TV", "http://x/3")));
        assert!(!classifier.exclude(&ch("Movie", "TV", "http://x/4")));
        assert!(classifier.exclude(&ch("Canal", "TV", "http://x/5.webm")));
    }
}
