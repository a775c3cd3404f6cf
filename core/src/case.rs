//! Naming-convention conversions used by model resolution.
//!
//! Model names arrive as `snake_case` (`user_profile`) and are looked up as
//! `UpperCamelCase` type names (`UserProfile`). Method-style field access goes
//! the other way: `getUserName` strips to `UserName` and maps to the field key
//! `user_name`.

/// `user_name` → `UserName`. Each `_`-separated segment gets its first
/// letter upper-cased; the rest of the segment is left alone.
pub fn upper_camel_case(input: &str) -> String {
    input.split('_').map(capitalize).collect()
}

/// `UserName` → `user_name`, `ABTest` → `ab_test`, `userID` → `user_id`.
///
/// The input is split into words: an uppercase run that is followed by the
/// end of input or by the start of a capitalised word forms an acronym word,
/// otherwise a word is one letter followed by lowercase letters or digits.
/// Acronym words are lower-cased entirely, other words only lose their
/// leading capital. Characters that belong to no word (`_`, lone lowercase
/// letters, punctuation) are dropped.
pub fn snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if let Some(end) = acronym_end(&chars, i) {
            let word: String = chars[i..end].iter().collect();
            words.push(word.to_ascii_lowercase());
            i = end;
            continue;
        }
        if let Some(end) = word_end(&chars, i) {
            let mut word: String = chars[i..end].iter().collect();
            word[..1].make_ascii_lowercase();
            words.push(word);
            i = end;
            continue;
        }
        i += 1;
    }

    words.join("_")
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_lower_or_digit(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// Longest `[A-Z][A-Z0-9]*` run starting at `start` that ends either at the
/// end of input or right before `[A-Z][a-z0-9]`.
fn acronym_end(chars: &[char], start: usize) -> Option<usize> {
    if !chars[start].is_ascii_uppercase() {
        return None;
    }
    let mut longest = start + 1;
    while longest < chars.len()
        && (chars[longest].is_ascii_uppercase() || chars[longest].is_ascii_digit())
    {
        longest += 1;
    }
    (start + 1..=longest).rev().find(|&end| {
        end == chars.len()
            || (chars[end].is_ascii_uppercase()
                && chars.get(end + 1).is_some_and(|&c| is_lower_or_digit(c)))
    })
}

/// `[A-Za-z][a-z0-9]+` starting at `start`.
fn word_end(chars: &[char], start: usize) -> Option<usize> {
    if !chars[start].is_ascii_alphabetic() {
        return None;
    }
    let mut end = start + 1;
    while end < chars.len() && is_lower_or_digit(chars[end]) {
        end += 1;
    }
    (end > start + 1).then_some(end)
}
