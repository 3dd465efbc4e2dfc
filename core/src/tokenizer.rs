use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{Alphabetic}\p{N}]+").expect("valid regex");
}

/// Tokenize text by lowercasing and splitting on runs of non-alphanumeric characters.
///
/// Alphanumeric follows `char::is_alphanumeric`, so vowel signs and other alphabetic
/// marks stay inside their word.
///
/// Documents and queries both go through this function; ranking depends on the two
/// sides sharing one normalization.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    RE.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

/// Count occurrences of each token. Returns the counts and the total token length.
pub fn term_frequencies<I>(tokens: I) -> (HashMap<String, u32>, u32)
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut len = 0u32;
    for token in tokens {
        *counts.entry(token).or_insert(0) += 1;
        len += 1;
    }
    (counts, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Hello, World!  hello_again");
        assert_eq!(t, vec!["hello", "world", "hello", "again"]);
    }

    #[test]
    fn keeps_vowel_signs_inside_words() {
        assert_eq!(tokenize("किताब, மொழி!"), vec!["किताब", "மொழி"]);
        assert!('\u{093F}'.is_alphanumeric());
    }

    #[test]
    fn counts_repeated_terms() {
        let (tf, len) = term_frequencies(tokenize("a b a c a"));
        assert_eq!(len, 5);
        assert_eq!(tf["a"], 3);
        assert_eq!(tf["b"], 1);
    }
}
