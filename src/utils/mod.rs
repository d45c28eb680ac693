use chrono::NaiveDate;

/// Fold common Latin diacritics to their ASCII base letter. Anything not
/// covered passes through unchanged.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' | 'ă' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'ī' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'ū' => 'u',
        'ý' | 'ÿ' => 'y',
        'ç' | 'ć' | 'č' => 'c',
        'ñ' | 'ń' => 'n',
        'š' | 'ś' => 's',
        'ž' | 'ź' | 'ż' => 'z',
        'ł' => 'l',
        'đ' => 'd',
        'ğ' => 'g',
        'ß' => 's',
        other => other,
    }
}

/// Canonical form used for cross-provider name comparison: lower-cased,
/// diacritics stripped, runs of non-alphanumerics collapsed to single
/// spaces, trimmed.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_space = true;

    for c in name.to_lowercase().chars().map(fold_diacritic) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }

    out.trim_end().to_string()
}

/// Fuzzy name equality: normalized forms are equal or one contains the
/// other. Known to produce false positives on short or ambiguous names;
/// accepted as a pragmatic trade-off, not silently tightened.
pub fn names_match(a: &str, b: &str) -> bool {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

/// Similarity score used only to rank candidates when more than one fixture
/// satisfies `names_match`. Symmetric by construction.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&normalize_name(a), &normalize_name(b))
}

/// URL-safe slug: ascii-folded, lower-cased, non-alphanumeric runs
/// collapsed to single hyphens.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_hyphen = true;

    for c in input.to_lowercase().chars().map(fold_diacritic) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }

    out.trim_end_matches('-').to_string()
}

/// Base slug for a fixture: `home-vs-away-YYYY-MM-DD`. This encodes the
/// secondary identity path, so its format must stay stable — previously
/// created fixtures become unlinkable if it changes.
pub fn match_base_slug(home: &str, away: &str, kickoff_date: NaiveDate) -> String {
    format!(
        "{}-vs-{}-{}",
        slugify(home),
        slugify(away),
        kickoff_date.format("%Y-%m-%d")
    )
}

/// Per-language slug: base slug plus the language code.
pub fn match_slug(base: &str, language: &str) -> String {
    format!("{}-{}", base, language)
}

/// Implied probability of a decimal price, before cross-outcome
/// normalization. Prices at or below 1.0 carry no information.
pub fn implied_probability(price: f64) -> Option<f64> {
    if price > 1.0 {
        Some(1.0 / price)
    } else {
        None
    }
}

/// Re-normalize implied probabilities so they sum to ~100, rounding each
/// share independently. Minor rounding drift (±1) is accepted rather than
/// forced back to an exact 100.
pub fn normalize_to_percentages(implied: &[f64]) -> Vec<i64> {
    let sum: f64 = implied.iter().sum();
    if sum <= 0.0 {
        return implied.iter().map(|_| 0).collect();
    }
    implied
        .iter()
        .map(|p| (p / sum * 100.0).round() as i64)
        .collect()
}
