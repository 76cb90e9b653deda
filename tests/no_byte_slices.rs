use anyhow::Context;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

// Answers, titles and previews routinely carry CJK text, so slicing a string
// at a literal byte offset (`text[..100]`, `id[8..]`) can panic mid-codepoint.
// Truncation goes through `utils::string::prefix_chars` instead. Only numeric
// literal bounds are flagged; `&buf[..n]` with a computed end is allowed.

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("read_dir failed: {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_rs_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
    Ok(())
}

#[test]
fn no_literal_byte_offset_slices_in_src() -> anyhow::Result<()> {
    let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");

    let patterns = [
        Regex::new(r"\[\s*\.\.=?\s*\d+\s*\]")?,
        Regex::new(r"\[\s*\d+\s*\.\.\s*\]")?,
        Regex::new(r"\[\s*\d+\s*\.\.=?\s*\d+\s*\]")?,
    ];

    let mut files = Vec::new();
    collect_rs_files(&src_dir, &mut files)?;

    let mut offenders = Vec::new();
    for path in files {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        for (i, line) in text.lines().enumerate() {
            if line.trim_start().starts_with("//") {
                continue;
            }
            if patterns.iter().any(|re| re.is_match(line)) {
                offenders.push(format!("{}:{}: {}", path.display(), i + 1, line.trim()));
            }
        }
    }

    anyhow::ensure!(
        offenders.is_empty(),
        "literal byte-offset slices found:\n{}",
        offenders.join("\n")
    );
    Ok(())
}
