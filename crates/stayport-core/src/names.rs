//! # Signature Name Matching
//!
//! The consent-form signature is matched against the pool of names verified
//! for the stay by exact normalized equality. No fuzzy or partial matching:
//! a guest either signed a name the stay has verified, or the check-in is
//! rejected at the authorization gate.

/// Normalize a guest name for comparison: trim surrounding whitespace and
/// case-fold. Interior whitespace is preserved — "Kim Minsu" and "KimMinsu"
/// are different names.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Find the first verified name equal to the signature under normalization.
///
/// Returns the matched pool entry as it appears in the pool (original
/// casing), so the caller can report which verified identity the signature
/// resolved to.
pub fn match_signature<'a, I>(signature_name: &str, verified_names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let wanted = normalize_name(signature_name);
    verified_names
        .into_iter()
        .find(|name| normalize_name(name) == wanted)
}
