//! Shortest-path word segmentation.
//!
//! [`Segmenter`] partitions UTF-8 text into dictionary words, choosing the
//! partition with the maximum joint probability under a unigram model. Each
//! dictionary word carries a path cost of `log2(1/p)`, so the most probable
//! partition is the one whose costs sum lowest: a single-source
//! shortest-path search over the DAG of candidate words, built lazily from
//! trie prefix lookups at each element position.
//!
//! The search is a left-to-right dynamic program: positions are finalized in
//! order because costs are non-negative and no candidate extends past the
//! proven reach, so no priority queue is needed. Characters absent from the
//! dictionary are covered by a synthesized one-element token with a fixed,
//! strongly disfavored cost, so every input segments completely.
//!
//! Loading is a write phase; after it, [`Segmenter::segment`] is pure and
//! may run concurrently from many threads over one shared segmenter.
//!
//! # Example
//! ```no_run
//! use std::path::PathBuf;
//! use hanseg_core::Segmenter;
//! use hanseg_dict::LoadMode;
//! use hanseg_types::segments_to_string;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut segmenter = Segmenter::new();
//! segmenter.load_sources(&[PathBuf::from("dictionary.txt")], LoadMode::Mmap)?;
//!
//! let segments = segmenter.segment("中国有十三亿人口".as_bytes());
//! println!("{}", segments_to_string(&segments));
//! # Ok(()) }
//! ```

use std::path::PathBuf;

use anyhow::Result;

use hanseg_dict::{Dictionary, LoadMode, MIN_TOKEN_FREQUENCY, Token, TokenId, load_sources};
use hanseg_types::{Element, Segment, split_elements};

/// Path cost charged to a synthesized single-element token for characters
/// absent from the dictionary. A tunable constant, not corpus-derived: high
/// enough that any real dictionary hit is preferred.
pub const FALLBACK_DISTANCE: f32 = 32.0;

/// Part-of-speech tag carried by fallback tokens.
pub const FALLBACK_POS: &str = "x";

/// Forward jump recorded at the element position where a candidate token
/// ends: the cheapest cumulative distance from the start of the current text
/// run, and the token achieving it.
#[derive(Clone, Copy)]
struct Jumper {
    min_distance: f32,
    token: Option<Jump>,
}

impl Jumper {
    const UNVISITED: Jumper = Jumper {
        min_distance: f32::INFINITY,
        token: None,
    };
}

#[derive(Clone, Copy)]
struct Jump {
    /// Elements covered by the winning token; 1 for the fallback.
    len: usize,
    /// Arena id of the dictionary token, `None` for the fallback.
    id: Option<TokenId>,
}

/// The segmentation facade: a finalized [`Dictionary`] plus the path search.
#[derive(Debug, Default)]
pub struct Segmenter {
    dict: Dictionary,
}

impl Segmenter {
    /// A segmenter with an empty dictionary. Segmenting before any load is
    /// well-defined but useless: every element becomes a fallback token.
    pub fn new() -> Self {
        Self::default()
    }

    /// The dictionary backing this segmenter.
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// Insert a batch of tokens and refresh path weights.
    ///
    /// May be called repeatedly before segmenting; every call re-finalizes,
    /// so weights always reflect the full frequency mass. Duplicate surface
    /// forms are dropped (first insertion wins), which makes reloading the
    /// same batch a no-op.
    pub fn load<I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = Token>,
    {
        for token in tokens {
            self.dict.add_token(token);
        }
        self.dict.finalize_weights();
    }

    /// Load ranked dictionary files; earlier paths shadow later ones on
    /// duplicate surface forms. Unreadable files are fatal.
    pub fn load_sources(&mut self, paths: &[PathBuf], mode: LoadMode) -> Result<()> {
        self.load(load_sources(paths, mode, MIN_TOKEN_FREQUENCY)?);
        Ok(())
    }

    /// Segment a UTF-8 byte buffer into contiguous covering spans.
    ///
    /// Empty input yields an empty vector. Pure: repeated calls with the
    /// same input produce identical output, and concurrent calls share no
    /// mutable state.
    pub fn segment(&self, text: &[u8]) -> Vec<Segment> {
        let elements = split_elements(text);
        if elements.is_empty() {
            return Vec::new();
        }

        let mut jumpers = vec![Jumper::UNVISITED; elements.len()];
        let mut hits: Vec<TokenId> = Vec::with_capacity(self.dict.max_token_len().max(1));
        // (first element index, winning jump) per output span, text order.
        let mut path: Vec<(usize, Jump)> = Vec::new();

        let mut start = 0;
        while start < elements.len() {
            // One independent text run: grow `reach` while candidate tokens
            // still extend past explored positions.
            let mut reach = start;
            let mut current = start;
            while current <= reach {
                let base = if current == start {
                    0.0
                } else {
                    jumpers[current - 1].min_distance
                };

                let window_end = (current + self.dict.max_token_len()).min(elements.len());
                self.dict.lookup(&elements[current..window_end], &mut hits);
                for &id in &hits {
                    let token = self.dict.token(id);
                    let location = current + token.len() - 1;
                    relax(
                        &mut jumpers[location],
                        base,
                        token.distance(),
                        Jump {
                            len: token.len(),
                            id: Some(id),
                        },
                    );
                    reach = reach.max(location);
                }

                // Hits come shortest first, so a single-element word would be
                // hits[0]. Without one, patch in the fallback so coverage
                // never breaks at this position.
                let covered_by_single = hits
                    .first()
                    .is_some_and(|&id| self.dict.token(id).len() == 1);
                // A zero-frequency word has infinite cost and can leave its
                // position uncovered; the fallback patches that too.
                if !covered_by_single || jumpers[current].token.is_none() {
                    relax(
                        &mut jumpers[current],
                        base,
                        FALLBACK_DISTANCE,
                        Jump { len: 1, id: None },
                    );
                }

                current += 1;
            }

            // Backtrack this run via the winning jumps; spans come out
            // backward and the run's slice is reversed in place.
            let run_begin = path.len();
            let mut index = reach;
            loop {
                let jump = jumpers[index].token.expect("every position is covered");
                let location = index + 1 - jump.len;
                path.push((location, jump));
                if location == start {
                    break;
                }
                index = location - 1;
            }
            path[run_begin..].reverse();

            start = reach + 1;
        }

        self.resolve(&elements, &path)
    }

    /// Turn element-indexed spans into byte-offset segments by accumulating
    /// surface byte lengths left to right.
    fn resolve(&self, elements: &[Element<'_>], path: &[(usize, Jump)]) -> Vec<Segment> {
        let mut output = Vec::with_capacity(path.len());
        let mut byte_position = 0;
        for &(first_element, jump) in path {
            let (text, pos, byte_len) = match jump.id {
                Some(id) => {
                    let token = self.dict.token(id);
                    (token.surface(), token.pos().to_string(), token.byte_len())
                }
                None => {
                    let element = &elements[first_element];
                    (
                        String::from_utf8_lossy(element).into_owned(),
                        FALLBACK_POS.to_string(),
                        element.len(),
                    )
                }
            };
            output.push(Segment {
                start: byte_position,
                end: byte_position + byte_len,
                text,
                pos,
            });
            byte_position += byte_len;
        }
        output
    }
}

/// Record `jump` at a position if it strictly improves the cumulative
/// distance. Ties keep the earlier candidate, which lookup order makes the
/// shorter, first-found one.
fn relax(jumper: &mut Jumper, base: f32, distance: f32, jump: Jump) {
    let new_distance = base + distance;
    if new_distance < jumper.min_distance {
        jumper.min_distance = new_distance;
        jumper.token = Some(jump);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hanseg_types::segments_to_string;

    fn entry(surface: &str, frequency: u32, pos: &str) -> Token {
        Token::from_surface(surface.as_bytes(), frequency, pos)
    }

    fn loaded(entries: &[(&str, u32, &str)]) -> Segmenter {
        let mut segmenter = Segmenter::new();
        segmenter.load(
            entries
                .iter()
                .map(|&(surface, frequency, pos)| entry(surface, frequency, pos)),
        );
        segmenter
    }

    fn demo_segmenter() -> Segmenter {
        loaded(&[
            ("中国", 8, "p"),
            ("有", 3, "p"),
            ("十三亿", 11, "p"),
            ("人口", 12, "p"),
        ])
    }

    #[test]
    fn segments_demo_sentence_with_byte_offsets() {
        let segmenter = demo_segmenter();
        let segments = segmenter.segment("中国有十三亿人口".as_bytes());

        assert_eq!(
            segments_to_string(&segments),
            "中国/p 有/p 十三亿/p 人口/p"
        );
        let offsets: Vec<(usize, usize)> = segments.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(offsets, [(0, 6), (6, 9), (9, 18), (18, 24)]);
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(demo_segmenter().segment(b"").is_empty());
    }

    #[test]
    fn output_is_deterministic() {
        let segmenter = demo_segmenter();
        let text = "中国有十三亿人口".as_bytes();
        assert_eq!(segmenter.segment(text), segmenter.segment(text));
    }

    #[test]
    fn unknown_characters_fall_back_to_single_elements() {
        let segmenter = demo_segmenter();
        let segments = segmenter.segment("中国真有人口".as_bytes());

        assert_eq!(
            segments_to_string(&segments),
            "中国/p 真/x 有/p 人口/p"
        );
    }

    #[test]
    fn coverage_reconstructs_the_input() {
        let segmenter = demo_segmenter();
        let text = "中国，有！十三亿？人口";
        let segments = segmenter.segment(text.as_bytes());

        let joined: String = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, text);
        let mut expected_start = 0;
        for segment in &segments {
            assert_eq!(segment.start, expected_start);
            expected_start = segment.end;
        }
        assert_eq!(expected_start, text.len());
    }

    #[test]
    fn prefers_compound_with_lower_cumulative_distance() {
        // 北京大学 is frequent enough that its single cost beats the summed
        // costs of 北京 + 大学.
        let segmenter = loaded(&[
            ("北京", 20, "ns"),
            ("大学", 15, "n"),
            ("北京大学", 30, "nt"),
        ]);
        let segments = segmenter.segment("北京大学".as_bytes());
        assert_eq!(segments_to_string(&segments), "北京大学/nt");
    }

    #[test]
    fn splits_compound_when_pieces_are_cheaper() {
        // Here the compound is marginal and the pieces dominate the mass, so
        // the two-token path costs less.
        let segmenter = loaded(&[
            ("北京", 1000, "ns"),
            ("大学", 1000, "n"),
            ("北京大学", 2, "nt"),
        ]);
        let segments = segmenter.segment("北京大学".as_bytes());
        assert_eq!(segments_to_string(&segments), "北京/ns 大学/n");
    }

    #[test]
    fn real_match_beats_fallback_for_known_single_characters() {
        let segmenter = loaded(&[("的", 2, "u")]);
        let segments = segmenter.segment("的".as_bytes());
        assert_eq!(segments_to_string(&segments), "的/u");
    }

    #[test]
    fn mixed_script_runs_segment_as_whole_words() {
        let segmenter = loaded(&[("github", 5, "eng"), ("中国", 8, "ns")]);
        let segments = segmenter.segment("GitHub在中国".as_bytes());

        assert_eq!(
            segments_to_string(&segments),
            "github/eng 在/x 中国/ns"
        );
        assert_eq!(segments[0].start, 0);
        assert_eq!(segments[0].end, 6);
        assert_eq!(segments[2].end, "GitHub在中国".len());
    }

    #[test]
    fn reloading_the_same_entries_is_idempotent() {
        let entries = [("中国", 8, "p"), ("人口", 12, "p")];
        let mut segmenter = loaded(&entries);
        let before = segmenter.segment("中国人口".as_bytes());

        segmenter.load(
            entries
                .iter()
                .map(|&(surface, frequency, pos)| entry(surface, frequency, pos)),
        );

        assert_eq!(segmenter.dictionary().token_count(), 2);
        assert_eq!(segmenter.dictionary().total_frequency(), 20);
        assert_eq!(segmenter.segment("中国人口".as_bytes()), before);
    }

    #[test]
    fn empty_dictionary_covers_everything_with_fallbacks() {
        let segmenter = Segmenter::new();
        let segments = segmenter.segment("真相".as_bytes());
        assert_eq!(segments_to_string(&segments), "真/x 相/x");
    }
}
