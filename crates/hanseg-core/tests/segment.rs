use std::path::PathBuf;

use hanseg_core::Segmenter;
use hanseg_dict::LoadMode;
use hanseg_types::segments_to_string;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_fixture_segmenter(mode: LoadMode) -> Segmenter {
    let mut segmenter = Segmenter::new();
    segmenter
        .load_sources(
            &[fixture("dict_user.txt"), fixture("dict_general.txt")],
            mode,
        )
        .expect("load fixture dictionaries");
    segmenter
}

#[test]
fn loads_ranked_sources_with_shadowing_and_filtering() {
    let segmenter = load_fixture_segmenter(LoadMode::Mmap);
    let dict = segmenter.dictionary();

    // 中国 from the general dictionary is shadowed by the user entry, and
    // the frequency-1 entry is filtered, leaving 4 + 4 words.
    assert_eq!(dict.token_count(), 8);
    assert_eq!(dict.total_frequency(), 149);
    assert_eq!(dict.max_token_len(), 4);
}

#[test]
fn segments_demo_sentence_using_user_dictionary_entries() {
    let segmenter = load_fixture_segmenter(LoadMode::Mmap);
    let segments = segmenter.segment("中国有十三亿人口".as_bytes());

    // `中国/p`, not `中国/n`: the earlier source won.
    assert_eq!(
        segments_to_string(&segments),
        "中国/p 有/p 十三亿/p 人口/p"
    );
    let offsets: Vec<(usize, usize)> = segments.iter().map(|s| (s.start, s.end)).collect();
    assert_eq!(offsets, [(0, 6), (6, 9), (9, 18), (18, 24)]);
}

#[test]
fn prefers_frequent_compound_over_its_pieces() {
    let segmenter = load_fixture_segmenter(LoadMode::Mmap);
    let segments = segmenter.segment("北京大学的人口".as_bytes());
    assert_eq!(
        segments_to_string(&segments),
        "北京大学/nt 的/u 人口/p"
    );
}

#[test]
fn owned_and_mmap_modes_load_identically() {
    let mmap = load_fixture_segmenter(LoadMode::Mmap);
    let owned = load_fixture_segmenter(LoadMode::Owned);

    let text = "北京大学有人口".as_bytes();
    assert_eq!(mmap.segment(text), owned.segment(text));
    assert_eq!(
        mmap.dictionary().total_frequency(),
        owned.dictionary().total_frequency()
    );
}
