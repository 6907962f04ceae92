//! Pure text transforms. Keep IO-bound coordination in `crate::services`.

use crate::constants::FALLBACK_LABEL;

/// Normalize an arbitrary label into a filesystem-safe token.
///
/// Characters outside ASCII alphanumerics, CJK ideographs, and (when
/// `allow_dots`) literal dots are replaced with underscores. Runs of
/// underscores collapse into one, and leading/trailing underscores (plus
/// dots when `allow_dots`) are trimmed. A label with no usable characters
/// yields the `"Unknown"` fallback. Idempotent: sanitizing a sanitized
/// label is a no-op.
pub fn sanitize_label(label: &str, allow_dots: bool) -> String {
    let mut out = String::with_capacity(label.len());
    let mut prev_underscore = false;
    for ch in label.chars() {
        let keep = ch.is_ascii_alphanumeric() || is_cjk_ideograph(ch) || (allow_dots && ch == '.');
        if keep {
            out.push(ch);
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }

    let trimmed = if allow_dots {
        out.trim_matches(|c: char| c == '_' || c == '.')
    } else {
        out.trim_matches('_')
    };

    if trimmed.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        trimmed.to_string()
    }
}

/// CJK Unified Ideographs block, the range Simplified Chinese labels occupy.
fn is_cjk_ideograph(ch: char) -> bool {
    matches!(ch, '\u{4E00}'..='\u{9FFF}')
}
