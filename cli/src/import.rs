use anyhow::{bail, Context, Result};
use mnemo_core::Mnemo;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputDoc {
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    occurrence: i64,
}

/// Import a `.json`/`.jsonl` file, or every such file under a directory. Returns the count.
pub fn import_path(mnemo: &Mnemo, input: &Path) -> Result<usize> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(extension(p), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }

    let mut count = 0;
    for file in files {
        let n = if extension(&file) == Some("jsonl") { import_jsonl(mnemo, &file)? } else { import_json(mnemo, &file)? };
        tracing::debug!(file = %file.display(), n, "imported file");
        count += n;
    }
    Ok(count)
}

fn extension(p: &Path) -> Option<&str> {
    p.extension().and_then(|s| s.to_str())
}

fn import_jsonl(mnemo: &Mnemo, file: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(file)?);
    let mut n = 0;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid document", file.display(), lineno + 1))?;
        ingest_doc(mnemo, doc)?;
        n += 1;
    }
    Ok(n)
}

fn import_json(mnemo: &Mnemo, file: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader).with_context(|| format!("parsing {}", file.display()))?;
    let docs: Vec<InputDoc> = match json {
        serde_json::Value::Array(arr) => arr.into_iter().map(serde_json::from_value).collect::<Result<_, _>>()?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        other => bail!("{}: expected a document object or an array of them, found {}", file.display(), other),
    };
    let n = docs.len();
    for doc in docs {
        ingest_doc(mnemo, doc)?;
    }
    Ok(n)
}

fn ingest_doc(mnemo: &Mnemo, doc: InputDoc) -> Result<()> {
    mnemo.insert(&doc.title, &doc.body, doc.occurrence)?;
    Ok(())
}
