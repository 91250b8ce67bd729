use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Word runs and punctuation runs come out as separate tokens.
    static ref RE: Regex =
        Regex::new(r"(?u)[\p{L}\p{N}_']+|[^\s\p{L}\p{N}_']+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub type TokenizerFn = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;
pub type StemmerFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Split text on word boundaries. Punctuation runs are emitted as their own tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Snowball English stemmer.
pub fn english_stem(token: &str) -> String {
    STEMMER.stem(token).into_owned()
}

pub fn english_stopwords() -> HashSet<String> {
    STOPWORDS.iter().map(|w| w.to_string()).collect()
}

fn is_punctuation(token: &str) -> bool {
    token.chars().all(|c| !c.is_alphanumeric())
}

/// Pieces the [`Normalizer`] is assembled from.
///
/// The default is the plain tokenizer with no stemming and no stopwords.
#[derive(Clone)]
pub struct NormalizerConfig {
    pub tokenizer: TokenizerFn,
    pub stemmer: Option<StemmerFn>,
    pub stopwords: HashSet<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { tokenizer: Arc::new(tokenize), stemmer: None, stopwords: HashSet::new() }
    }
}

impl NormalizerConfig {
    /// English stemming and the English stopword list.
    pub fn english() -> Self {
        Self {
            tokenizer: Arc::new(tokenize),
            stemmer: Some(Arc::new(english_stem)),
            stopwords: english_stopwords(),
        }
    }
}

/// Turns raw text into index terms.
///
/// Steps: tokenize, lowercase (after NFKC), drop stopwords, drop empty and
/// punctuation-only tokens, stem. Stopwords are matched before stemming and
/// are compared lowercased.
#[derive(Clone)]
pub struct Normalizer {
    tokenizer: TokenizerFn,
    stemmer: Option<StemmerFn>,
    stopwords: HashSet<String>,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let stopwords = config.stopwords.into_iter().map(|w| w.to_lowercase()).collect();
        Self { tokenizer: config.tokenizer, stemmer: config.stemmer, stopwords }
    }

    pub fn normalize(&self, text: &str) -> Vec<String> {
        let mut terms = Vec::new();
        for token in (self.tokenizer)(text) {
            let token = token.nfkc().collect::<String>().to_lowercase();
            if self.stopwords.contains(&token) {
                continue;
            }
            if token.is_empty() || is_punctuation(&token) {
                continue;
            }
            let term = match &self.stemmer {
                Some(stem) => stem(&token),
                None => token,
            };
            if !term.is_empty() {
                terms.push(term);
            }
        }
        terms
    }

    /// The canonical term for a single query word, if it produces one.
    pub fn normalize_term(&self, word: &str) -> Option<String> {
        self.normalize(word).into_iter().next()
    }
}

impl Default for Normalizer {
    fn default() -> Self { Self::new(NormalizerConfig::default()) }
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer")
            .field("stemmer", &self.stemmer.is_some())
            .field("stopwords", &self.stopwords.len())
            .finish()
    }
}
