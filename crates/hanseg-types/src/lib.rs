//! Shared text primitives for the hanseg segmenter.
//!
//! The segmenter never works on whole strings: input is first cut into
//! [`Element`]s, the indivisible units of segmentation. One element is either
//! the UTF-8 bytes of a single code point, or one maximal run of ASCII
//! letters and digits folded to lowercase, so `"GitHub"` is one element and
//! not six, while CJK text yields one element per character. Dictionary surface
//! forms and lookup windows are both sequences of elements.
//!
//! [`Segment`] is the resolved output span of a segmentation, and
//! [`segments_to_string`] renders a run of them as `surface/pos` pairs for
//! diagnostics and test fixtures.
//!
//! ```rust
//! use hanseg_types::split_elements;
//!
//! let elements = split_elements("中国Yahoo".as_bytes());
//! assert_eq!(elements.len(), 3);
//! assert_eq!(elements[0].as_ref(), "中".as_bytes());
//! assert_eq!(elements[2].as_ref(), b"yahoo");
//! ```

use std::borrow::Cow;

/// One indivisible unit of text: the encoded bytes of a single code point,
/// or a lowercased maximal run of ASCII letters and digits.
///
/// Borrowed when the bytes pass through unchanged, owned when lowercasing
/// rewrote them. A byte that does not start a valid UTF-8 sequence becomes a
/// one-byte element.
pub type Element<'a> = Cow<'a, [u8]>;

/// Cut a byte buffer into [`Element`]s.
///
/// Deterministic, no I/O, never fails. The element order is the text order
/// and is what every downstream position refers to.
pub fn split_elements(text: &[u8]) -> Vec<Element<'_>> {
    let mut output = Vec::new();
    let mut current = 0;
    let mut run_start = 0;
    let mut in_run = false;

    while current < text.len() {
        if text[current].is_ascii_alphanumeric() {
            if !in_run {
                run_start = current;
                in_run = true;
            }
            current += 1;
            continue;
        }

        if in_run {
            output.push(fold_run(&text[run_start..current]));
            in_run = false;
        }

        let size = code_point_len(&text[current..]);
        output.push(Cow::Borrowed(&text[current..current + size]));
        current += size;
    }

    if in_run {
        output.push(fold_run(&text[run_start..]));
    }

    output
}

fn fold_run(run: &[u8]) -> Element<'_> {
    if run.iter().any(u8::is_ascii_uppercase) {
        Cow::Owned(run.to_ascii_lowercase())
    } else {
        Cow::Borrowed(run)
    }
}

/// Byte length of the UTF-8 sequence starting at `bytes[0]`.
///
/// Invalid leading bytes and truncated or broken sequences count as one byte,
/// so the splitter always makes progress.
fn code_point_len(bytes: &[u8]) -> usize {
    let len = match bytes[0] {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return 1,
    };
    if bytes.len() < len || !bytes[1..len].iter().all(|b| (0x80..=0xbf).contains(b)) {
        return 1;
    }
    len
}

/// A resolved span of a segmentation: byte offsets into the original buffer
/// plus the surface form and part-of-speech tag of the covering token.
///
/// A full segmentation is contiguous: spans never overlap, never leave gaps,
/// and together cover `[0, text.len())`.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Byte offset of the first byte of the span.
    pub start: usize,
    /// Byte offset one past the last byte of the span.
    pub end: usize,
    /// Surface form of the covering token (lowercased for ASCII runs).
    pub text: String,
    /// Part-of-speech tag; `"x"` for out-of-dictionary fallbacks.
    pub pos: String,
}

/// Render a segmentation as space-separated `surface/pos` pairs.
///
/// Diagnostics and test fixtures only; not part of the functional contract.
pub fn segments_to_string(segments: &[Segment]) -> String {
    let mut output = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            output.push(' ');
        }
        output.push_str(&segment.text);
        output.push('/');
        output.push_str(&segment.pos);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_to_strings(text: &[u8]) -> Vec<String> {
        split_elements(text)
            .iter()
            .map(|e| String::from_utf8_lossy(e).into_owned())
            .collect()
    }

    #[test]
    fn splits_cjk_one_element_per_character() {
        assert_eq!(
            split_to_strings("中国有十三亿人口".as_bytes()),
            ["中", "国", "有", "十", "三", "亿", "人", "口"]
        );
    }

    #[test]
    fn folds_ascii_runs_to_single_lowercase_elements() {
        assert_eq!(
            split_to_strings(b"GitHub is a web-based hosting service"),
            [
                "github", " ", "is", " ", "a", " ", "web", "-", "based", " ", "hosting", " ",
                "service"
            ]
        );
    }

    #[test]
    fn splits_mixed_script_text() {
        assert_eq!(
            split_to_strings("中国雅虎Yahoo! China".as_bytes()),
            ["中", "国", "雅", "虎", "yahoo", "!", " ", "china"]
        );
    }

    #[test]
    fn borrows_runs_that_are_already_lowercase() {
        let elements = split_elements(b"abc123 DEF");
        assert!(matches!(elements[0], Cow::Borrowed(_)));
        assert!(matches!(elements[2], Cow::Owned(_)));
        assert_eq!(elements[2].as_ref(), b"def");
    }

    #[test]
    fn invalid_utf8_bytes_become_single_elements() {
        // Truncated three-byte sequence followed by a bare continuation byte.
        let elements = split_elements(&[0xe4, 0xb8, b'a']);
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].as_ref(), &[0xe4]);
        assert_eq!(elements[1].as_ref(), &[0xb8]);
        assert_eq!(elements[2].as_ref(), b"a");
    }

    #[test]
    fn empty_input_yields_no_elements() {
        assert!(split_elements(b"").is_empty());
    }

    #[test]
    fn element_byte_lengths_cover_the_source_span() {
        let text = "中国abc".as_bytes();
        let total: usize = split_elements(text).iter().map(|e| e.len()).sum();
        assert_eq!(total, text.len());
    }

    #[test]
    fn renders_segments_as_surface_pos_pairs() {
        let segments = vec![
            Segment {
                start: 0,
                end: 6,
                text: "中国".to_string(),
                pos: "ns".to_string(),
            },
            Segment {
                start: 6,
                end: 9,
                text: "有".to_string(),
                pos: "v".to_string(),
            },
        ];
        assert_eq!(segments_to_string(&segments), "中国/ns 有/v");
        assert_eq!(segments_to_string(&[]), "");
    }
}
