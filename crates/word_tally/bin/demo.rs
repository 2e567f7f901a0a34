//! Word-tally demo: count words across files and print a JSON report.
//!
//! ## Running
//!
//! ```bash
//! # tally one or more files
//! cargo run -p word_tally --bin demo -- README.md DESIGN.md
//!
//! # or pipe text on stdin
//! echo "to be or not to be" | cargo run -p word_tally --bin demo
//! ```

use std::env;
use std::fs;
use std::io::Read;

use anyhow::{Context, Result};
use word_tally::Tally;

fn main() -> Result<()> {
    let paths: Vec<String> = env::args().skip(1).collect();

    let combined: Tally = if paths.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        Tally::of_text(&text)
    } else {
        paths
            .iter()
            .map(|path| {
                let text =
                    fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
                Ok(Tally::of_text(&text))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .collect()
    };

    let (top_word, top_count) = combined
        .most_frequent()
        .map(|(word, count)| (word.to_string(), count))
        .unwrap_or_default();

    let report = serde_json::json!({
        "total_tokens": combined.total(),
        "distinct_words": combined.distinct(),
        "most_frequent": { "word": top_word, "count": top_count },
        "counts": combined.counts(),
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
