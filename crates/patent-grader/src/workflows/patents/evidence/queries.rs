use std::collections::{HashMap, HashSet};

const STOPWORDS: &[&str] = &[
    "about", "above", "according", "also", "among", "and", "another", "apparatus", "based",
    "being", "between", "both", "can", "comprises", "comprising", "configured", "each", "from",
    "having", "herein", "including", "into", "invention", "least", "method", "more", "other",
    "present", "provide", "provided", "provides", "said", "same", "such", "system", "than",
    "that", "their", "them", "then", "there", "thereby", "therein", "these", "this", "those",
    "through", "unit", "used", "using", "when", "where", "which", "while", "with", "within",
];

const RETRIEVAL_SUFFIX: [&str; 3] = ["market size", "growth", "industry application"];

/// Frequency-ranked terms from an abstract; ties keep first-occurrence order.
pub fn extract_keyterms(text: &str, limit: usize) -> Vec<String> {
    let mut frequencies: HashMap<String, (usize, usize)> = HashMap::new();

    for (position, token) in tokenize(text).into_iter().enumerate() {
        if !is_candidate(&token) {
            continue;
        }
        let entry = frequencies.entry(token).or_insert((0, position));
        entry.0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = frequencies
        .into_iter()
        .map(|(term, (count, first))| (term, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(term, _, _)| term)
        .collect()
}

/// Lower-cased word tokens; hyphens stay inside words.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|token| token.trim_matches('-').to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn is_candidate(token: &str) -> bool {
    let starts_alpha = token.chars().next().is_some_and(|c| c.is_alphabetic());
    starts_alpha && token.chars().count() >= 4 && !STOPWORDS.contains(&token)
}

/// Keyword, the first six key terms and the market suffix, de-duplicated case-insensitively.
pub fn retrieval_query(keyword: &str, keyterms: &[String]) -> String {
    let mut seen = HashSet::new();
    let mut parts = Vec::new();

    let candidates = std::iter::once(keyword)
        .chain(keyterms.iter().take(6).map(String::as_str))
        .chain(RETRIEVAL_SUFFIX);

    for part in candidates {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if seen.insert(part.to_lowercase()) {
            parts.push(part.to_string());
        }
    }

    parts.join(" ")
}

/// Market-size, growth-rate and general forecast queries, in that order.
pub fn web_queries(keyword: &str, keyterms: &[String]) -> [String; 3] {
    let keyword = keyword.trim();
    let focus = keyterms
        .iter()
        .filter(|term| !term.eq_ignore_ascii_case(keyword))
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");

    let subject = if focus.is_empty() {
        keyword.to_string()
    } else {
        format!("{keyword} {focus}")
    };

    [
        format!("{subject} market size billion USD"),
        format!("{subject} CAGR growth rate forecast"),
        format!("{keyword} application market forecast"),
    ]
}
