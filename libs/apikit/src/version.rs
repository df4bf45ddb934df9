//! Version inference over a unit's declared path segments.

/// Return the first segment that looks like an API version tag: a `v`
/// (case-insensitive) followed by one or more ASCII digits. `None` means
/// the unit belongs to the distinct "unversioned" bucket.
///
/// Pure and side-effect free; the matched segment is returned with its
/// original casing.
pub fn infer_version<'a>(segments: &[&'a str]) -> Option<&'a str> {
    segments.iter().copied().find(|s| is_version_segment(s))
}

fn is_version_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    if !matches!(chars.next(), Some('v' | 'V')) {
        return false;
    }
    let rest = chars.as_str();
    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
}
