/// Characters that must never reach an externally visible key.
///
/// Path separators and the glob/fragment characters understood by object stores.
const RESERVED: &[char] = &['/', '\\', '#', '[', ']', '?', '*'];

/// Strip reserved characters and surrounding whitespace from one key segment.
///
/// The result may be empty; callers decide whether that is an error.
pub fn sanitize_segment(raw: &str) -> String {
    raw.trim().chars().filter(|c| !RESERVED.contains(c)).collect()
}
