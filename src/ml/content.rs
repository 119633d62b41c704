use std::collections::{HashMap, HashSet};

use regex::Regex;

/// English stop words dropped by the count vectorizer
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here", "hereafter",
    "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his", "how", "however",
    "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into", "is", "it", "its",
    "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd", "made", "many", "may",
    "me", "meanwhile", "might", "mill", "mine", "more", "moreover", "most", "mostly", "move",
    "much", "must", "my", "myself", "name", "namely", "neither", "never", "nevertheless", "next",
    "nine", "no", "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of",
    "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise",
    "our", "ours", "ourselves", "out", "over", "own", "part", "per", "perhaps", "please", "put",
    "rather", "re", "same", "see", "seem", "seemed", "seeming", "seems", "serious", "several",
    "she", "should", "show", "side", "since", "sincere", "six", "sixty", "so", "some", "somehow",
    "someone", "something", "sometime", "sometimes", "somewhere", "still", "such", "system",
    "take", "ten", "than", "that", "the", "their", "them", "themselves", "then", "thence", "there",
    "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they", "thick",
    "thin", "third", "this", "those", "though", "three", "through", "throughout", "thru", "thus",
    "to", "together", "too", "top", "toward", "towards", "twelve", "twenty", "two", "un", "under",
    "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were", "what", "whatever",
    "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein",
    "whereupon", "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole",
    "whom", "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your",
    "yours", "yourself", "yourselves",
];

/// Splits documents into lowercase tokens of two or more word characters,
/// dropping English stop words
pub struct Tokenizer {
    pattern: Regex,
    stop_words: HashSet<&'static str>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"\b\w\w+\b").expect("token pattern is valid"),
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
        }
    }

    pub fn tokenize(&self, document: &str) -> Vec<String> {
        let lowered = document.to_lowercase();
        self.pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(token))
            .map(str::to_string)
            .collect()
    }
}

/// Sparse count vector: (term index, count) sorted by term index
type CountVector = Vec<(usize, f64)>;

/// Bag-of-words count vectors with an inverted index for cosine similarity
pub struct ContentIndex {
    rows: Vec<CountVector>,
    norms: Vec<f64>,
    /// term index -> rows containing it, with counts
    postings: Vec<Vec<(usize, f64)>>,
}

impl ContentIndex {
    /// Fits the vocabulary on the documents and vectorizes each of them
    pub fn build<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tokenizer = Tokenizer::new();
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut rows = Vec::new();

        for document in documents {
            let mut counts: HashMap<usize, f64> = HashMap::new();
            for token in tokenizer.tokenize(document) {
                let next = vocabulary.len();
                let term = *vocabulary.entry(token).or_insert(next);
                *counts.entry(term).or_default() += 1.0;
            }
            let mut row: CountVector = counts.into_iter().collect();
            row.sort_by_key(|(term, _)| *term);
            rows.push(row);
        }

        let mut postings = vec![Vec::new(); vocabulary.len()];
        for (row_index, row) in rows.iter().enumerate() {
            for &(term, count) in row {
                postings[term].push((row_index, count));
            }
        }

        let norms = rows
            .iter()
            .map(|row| row.iter().map(|(_, c)| c * c).sum::<f64>().sqrt())
            .collect();

        tracing::info!(
            documents = rows.len(),
            vocabulary = vocabulary.len(),
            "Built content index"
        );

        Self {
            rows,
            norms,
            postings,
        }
    }

    /// Cosine similarity between two rows; rows without tokens score 0
    pub fn similarity(&self, a: usize, b: usize) -> f64 {
        let (Some(row_a), Some(row_b)) = (self.rows.get(a), self.rows.get(b)) else {
            return 0.0;
        };
        let denominator = self.norms[a] * self.norms[b];
        if denominator == 0.0 {
            return 0.0;
        }

        let (mut i, mut j, mut dot) = (0, 0, 0.0);
        while i < row_a.len() && j < row_b.len() {
            match row_a[i].0.cmp(&row_b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dot += row_a[i].1 * row_b[j].1;
                    i += 1;
                    j += 1;
                }
            }
        }
        dot / denominator
    }

    /// Cosine similarity of `index` against every row
    pub fn similarities(&self, index: usize) -> Vec<f64> {
        let mut scores = vec![0.0; self.rows.len()];
        let Some(row) = self.rows.get(index) else {
            return scores;
        };
        if self.norms[index] == 0.0 {
            return scores;
        }

        for &(term, count) in row {
            for &(other, other_count) in &self.postings[term] {
                scores[other] += count * other_count;
            }
        }
        for (other, score) in scores.iter_mut().enumerate() {
            let denominator = self.norms[index] * self.norms[other];
            *score = if denominator == 0.0 { 0.0 } else { *score / denominator };
        }
        scores
    }

    /// The `n` rows most similar to `index`, best first
    ///
    /// The query row is never returned. Ties keep row order, so rows with
    /// zero similarity only appear when fewer than `n` rows share a token.
    pub fn similar(&self, index: usize, n: usize) -> Vec<(usize, f64)> {
        if index >= self.rows.len() || n == 0 {
            return Vec::new();
        }
        let mut ranked: Vec<(usize, f64)> = self
            .similarities(index)
            .into_iter()
            .enumerate()
            .filter(|(row, _)| *row != index)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}
