use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalizes free text for signature matching: NFD-decompose, drop the
/// combining marks, uppercase, and collapse every non-alphanumeric run into
/// a single space. Catalog signatures are written against this form, so they
/// never have to care about accents or punctuation variance.
pub fn normalize(text: &str) -> String {
    let stripped: String = text.nfd().filter(|ch| !is_combining_mark(*ch)).collect();
    let upper = stripped.to_uppercase();

    let mut out = String::with_capacity(upper.len());
    let mut pending_space = false;
    for ch in upper.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
    out
}
