//! Weighted word dictionary backed by an element-keyed prefix trie.
//!
//! A [`Dictionary`] owns every [`Token`] in an arena and indexes their
//! surface forms in a trie whose edges are single [`Element`]s. The one
//! query the segmenter needs is [`Dictionary::lookup`]: all dictionary words
//! that are a prefix of a window of input elements, shortest first.
//!
//! Construction is a write phase: insert tokens (first insertion of a
//! surface form wins), then call [`Dictionary::finalize_weights`] to derive
//! each token's path cost from the aggregate frequency mass. After that the
//! dictionary is read-only and lookups may run concurrently.
//!
//! Dictionary text files (one `surface frequency pos` line per word) are
//! read by [`load_sources`], with a runtime choice between memory-mapped and
//! owned buffers via [`LoadMode`].
//!
//! ```no_run
//! use std::path::PathBuf;
//! use hanseg_dict::{build_dictionary, LoadMode, MIN_TOKEN_FREQUENCY};
//!
//! # fn main() -> anyhow::Result<()> {
//! let sources = [PathBuf::from("user_dict.txt"), PathBuf::from("dictionary.txt")];
//! let dict = build_dictionary(&sources, LoadMode::Mmap, MIN_TOKEN_FREQUENCY)?;
//! println!("{} words, frequency mass {}", dict.token_count(), dict.total_frequency());
//! # Ok(()) }
//! ```

use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memmap2::Mmap;
use tracing::{info, warn};

use hanseg_types::{Element, split_elements};

/// Entries below this corpus frequency are dropped by the default loader
/// configuration.
pub const MIN_TOKEN_FREQUENCY: u32 = 2;

/// Handle into the [`Dictionary`] token arena.
pub type TokenId = u32;

/// A dictionary word: its surface form as an element sequence, its corpus
/// frequency, a part-of-speech tag, and the path cost derived from the
/// frequency once the owning dictionary finalizes.
///
/// The cost is `log2(total frequency mass) - log2(frequency)`, i.e.
/// `log2(1/p)` under a unigram model: rarer words cost more, so minimizing
/// the summed cost of a partition maximizes its joint probability.
#[derive(Clone, Debug)]
pub struct Token {
    text: Vec<Box<[u8]>>,
    frequency: u32,
    distance: f32,
    pos: String,
}

impl Token {
    /// Build a token from an already-split element sequence.
    pub fn new<I>(text: I, frequency: u32, pos: impl Into<String>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Box<[u8]>>,
    {
        Token {
            text: text.into_iter().map(Into::into).collect(),
            frequency,
            distance: 0.0,
            pos: pos.into(),
        }
    }

    /// Build a token by splitting a raw surface form into elements first.
    pub fn from_surface(surface: &[u8], frequency: u32, pos: impl Into<String>) -> Self {
        let text = split_elements(surface)
            .into_iter()
            .map(|e| e.into_owned().into_boxed_slice());
        Token::new(text, frequency, pos)
    }

    /// The surface form as elements.
    pub fn text(&self) -> &[Box<[u8]>] {
        &self.text
    }

    /// Surface form length in elements.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True for the degenerate empty surface form.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Total byte length of the surface form.
    pub fn byte_len(&self) -> usize {
        self.text.iter().map(|e| e.len()).sum()
    }

    /// The surface form as one string (lossy for non-UTF-8 bytes).
    pub fn surface(&self) -> String {
        let mut out = String::with_capacity(self.byte_len());
        for element in &self.text {
            out.push_str(&String::from_utf8_lossy(element));
        }
        out
    }

    /// Corpus frequency.
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Part-of-speech tag; may be empty.
    pub fn pos(&self) -> &str {
        &self.pos
    }

    /// Path cost; zero until the owning dictionary finalizes.
    pub fn distance(&self) -> f32 {
        self.distance
    }
}

#[derive(Debug, Default)]
struct TrieNode {
    word: Box<[u8]>,
    token: Option<TokenId>,
    children: Vec<TrieNode>,
}

/// Prefix trie over element sequences plus the token arena and the
/// aggregate statistics the path search needs.
#[derive(Debug, Default)]
pub struct Dictionary {
    root: TrieNode,
    tokens: Vec<Token>,
    max_token_len: usize,
    total_frequency: u64,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Longest surface form in the dictionary, in elements. Bounds the
    /// lookup window the segmenter slices per input position.
    pub fn max_token_len(&self) -> usize {
        self.max_token_len
    }

    /// Number of distinct words held.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Sum of all held words' frequencies.
    pub fn total_frequency(&self) -> u64 {
        self.total_frequency
    }

    /// Resolve an id returned by [`lookup`](Dictionary::lookup).
    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id as usize]
    }

    /// Iterate every held token in insertion order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Insert a token, returning whether it was kept.
    ///
    /// The first insertion of a surface form wins and later duplicates are
    /// dropped, so higher-priority sources loaded first shadow later ones.
    pub fn add_token(&mut self, token: Token) -> bool {
        let mut current = &mut self.root;
        for word in &token.text {
            current = upsert(current, word);
        }
        if current.token.is_some() {
            return false;
        }

        current.token = Some(self.tokens.len() as TokenId);
        self.max_token_len = self.max_token_len.max(token.text.len());
        self.total_frequency += u64::from(token.frequency);
        self.tokens.push(token);
        true
    }

    /// Collect every token whose surface form is a prefix of `words`.
    ///
    /// Walks the trie one element at a time, pushing the id of each bound
    /// token passed, so `hits` ends up in increasing surface length order.
    /// Stops at the first element with no matching child. Clears `hits`
    /// first; callers reuse the buffer across positions. Returns the number
    /// of hits.
    pub fn lookup(&self, words: &[Element<'_>], hits: &mut Vec<TokenId>) -> usize {
        hits.clear();
        let mut current = &self.root;
        for word in words {
            if current.children.is_empty() {
                break;
            }
            let Ok(index) = binary_search(&current.children, word.as_ref()) else {
                break;
            };
            current = &current.children[index];
            if let Some(id) = current.token {
                hits.push(id);
            }
        }
        hits.len()
    }

    /// Recompute every token's path cost from the aggregate frequency mass.
    ///
    /// O(token count); runs once per load batch, not per insertion, and must
    /// run before any segmentation. Distances are meaningless beforehand.
    pub fn finalize_weights(&mut self) {
        if self.total_frequency == 0 {
            return;
        }
        let log_total = (self.total_frequency as f32).log2();
        for token in &mut self.tokens {
            token.distance = log_total - (token.frequency as f32).log2();
        }
    }
}

/// Child of `node` keyed by `word`, created at the sorted insertion point
/// when missing.
fn upsert<'a>(node: &'a mut TrieNode, word: &[u8]) -> &'a mut TrieNode {
    let index = match binary_search(&node.children, word) {
        Ok(index) => index,
        Err(index) => {
            node.children.insert(
                index,
                TrieNode {
                    word: word.into(),
                    ..TrieNode::default()
                },
            );
            index
        }
    };
    &mut node.children[index]
}

/// Binary search over a sorted child array by element byte content.
///
/// `Ok` carries the matching index, `Err` the insertion point. The first and
/// last children are compared before the interval halving, which keeps the
/// common append and miss cases a single comparison.
fn binary_search(nodes: &[TrieNode], word: &[u8]) -> std::result::Result<usize, usize> {
    if nodes.is_empty() {
        return Err(0);
    }

    let last = nodes.len() - 1;
    match word.cmp(nodes[0].word.as_ref()) {
        Ordering::Less => return Err(0),
        Ordering::Equal => return Ok(0),
        Ordering::Greater => {}
    }
    match word.cmp(nodes[last].word.as_ref()) {
        Ordering::Greater => return Err(last + 1),
        Ordering::Equal => return Ok(last),
        Ordering::Less => {}
    }

    let mut start = 0;
    let mut end = last;
    let mut current = end / 2;
    while end - start > 1 {
        match word.cmp(nodes[current].word.as_ref()) {
            Ordering::Equal => return Ok(current),
            Ordering::Less => {
                end = current;
                current = (start + current) / 2;
            }
            Ordering::Greater => {
                start = current;
                current = (current + end) / 2;
            }
        }
    }
    Err(end)
}

/// Strategy for reading dictionary source files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map each source file (fast, zero-copy).
    Mmap,
    /// Read each source file into an owned buffer (portable fallback).
    Owned,
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

/// Parse ranked dictionary sources into tokens, in source order.
///
/// Each line is whitespace-delimited `surface frequency pos`; the tag may be
/// absent. Lines that do not parse are skipped with a warning; entries below
/// `min_frequency` are filtered out. An unreadable file is a hard error;
/// callers should treat it as fatal at startup rather than serve with a
/// partial dictionary. Earlier files come first in the result, so inserting
/// the tokens in order makes them shadow later duplicates.
pub fn load_sources(paths: &[PathBuf], mode: LoadMode, min_frequency: u32) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    for path in paths {
        let buffer = load_file(path, mode)?;
        let before = tokens.len();
        parse_source(buffer.as_slice(), path, min_frequency, &mut tokens);
        info!(
            "loaded {} entries from {}",
            tokens.len() - before,
            path.display()
        );
    }
    Ok(tokens)
}

/// Build a finalized dictionary straight from ranked source files.
pub fn build_dictionary(
    paths: &[PathBuf],
    mode: LoadMode,
    min_frequency: u32,
) -> Result<Dictionary> {
    let mut dict = Dictionary::new();
    for token in load_sources(paths, mode, min_frequency)? {
        dict.add_token(token);
    }
    dict.finalize_weights();
    Ok(dict)
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer> {
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        LoadMode::Owned => {
            let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

fn parse_source(bytes: &[u8], path: &Path, min_frequency: u32, out: &mut Vec<Token>) {
    for (lineno, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line = strip_cr(raw_line);
        if line.is_empty() {
            continue;
        }
        let Ok(line_str) = std::str::from_utf8(line) else {
            warn!("{}:{} skipping non-UTF-8 line", path.display(), lineno + 1);
            continue;
        };

        let mut fields = line_str.split_ascii_whitespace();
        let (Some(surface), Some(frequency)) = (fields.next(), fields.next()) else {
            if !line_str.trim().is_empty() {
                warn!("{}:{} skipping malformed line", path.display(), lineno + 1);
            }
            continue;
        };
        let Ok(frequency) = frequency.parse::<u32>() else {
            warn!(
                "{}:{} skipping line with bad frequency",
                path.display(),
                lineno + 1
            );
            continue;
        };
        if frequency < min_frequency {
            continue;
        }
        let pos = fields.next().unwrap_or("");

        out.push(Token::from_surface(surface.as_bytes(), frequency, pos));
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    if line.ends_with(b"\r") {
        &line[..line.len() - 1]
    } else {
        line
    }
}
