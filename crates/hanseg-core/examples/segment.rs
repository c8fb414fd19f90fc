use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use hanseg_core::Segmenter;
use hanseg_dict::LoadMode;
use hanseg_types::segments_to_string;

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let dict_paths: Vec<PathBuf> = args
        .next()
        .context("usage: cargo run -p hanseg-core --example segment -- <dict[,dict...]> [text]")?
        .split(',')
        .map(PathBuf::from)
        .collect();
    let text = args
        .next()
        .unwrap_or_else(|| "中国互联网历史上最大的一笔并购案".to_string());

    let mut segmenter = Segmenter::new();
    segmenter.load_sources(&dict_paths, LoadMode::Mmap)?;
    println!(
        "{} words loaded (frequency mass {})",
        segmenter.dictionary().token_count(),
        segmenter.dictionary().total_frequency()
    );

    let segments = segmenter.segment(text.as_bytes());
    println!("{}", segments_to_string(&segments));
    for segment in &segments {
        println!(
            "[{:>4}, {:>4})  {}/{}",
            segment.start, segment.end, segment.text, segment.pos
        );
    }

    Ok(())
}
