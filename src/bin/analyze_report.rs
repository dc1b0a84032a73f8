use anyhow::{bail, Context};
use veritext::services::analysis::AnalysisEngine;
use veritext::services::config_store::ConfigStore;
use veritext::services::text_processor::normalize_whitespace;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

/// Load document text: PDFs are extracted, anything else is read as UTF-8.
fn load_document_text(path: &str) -> anyhow::Result<String> {
    let is_pdf = std::path::Path::new(path)
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        pdf_extract::extract_text(path)
            .with_context(|| format!("failed to extract text from PDF: {}", path))
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  analyze_report <path.txt|path.pdf> [--window <n>] [--step <n>] [--threshold <pct>] [--limit <n>] [--timeout <secs>] [--out <json_path>]\n\nNotes:\n  - Search credentials: GOOGLE_API_KEY + GOOGLE_CSE_ID (or the config file).\n  - Classifier credentials: SAPLING_API_KEY (or the config file).\n  - Without credentials the run still completes; affected scores degrade to neutral values."
        );
        return Ok(());
    }

    veritext::init_logging();

    let path = args[1].clone();
    let out_path = parse_arg_value(&args, "--out");

    let config_dir = ConfigStore::default_config_dir()
        .context("could not determine a config directory")?;
    let mut config = ConfigStore::new(config_dir)
        .load()
        .map_err(|e| anyhow::anyhow!(e))?;

    if let Some(v) = parse_arg_value(&args, "--window").and_then(|s| s.parse().ok()) {
        config.analysis.fragment_window = v;
    }
    if let Some(v) = parse_arg_value(&args, "--step").and_then(|s| s.parse().ok()) {
        config.analysis.fragment_step = v;
    }
    if let Some(v) = parse_arg_value(&args, "--threshold").and_then(|s| s.parse().ok()) {
        config.analysis.similarity_threshold = v;
    }
    if let Some(v) = parse_arg_value(&args, "--limit").and_then(|s| s.parse().ok()) {
        config.analysis.result_limit = v;
    }
    if let Some(v) = parse_arg_value(&args, "--timeout").and_then(|s| s.parse().ok()) {
        config.analysis.timeout_secs = v;
    }

    let raw = load_document_text(&path)?;
    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        bail!("document contains no analyzable text: {}", path);
    }

    println!("File: {}", path);
    println!("Text: {} chars ({} bytes)", text.chars().count(), text.len());
    println!(
        "Window/step: {}/{} words, threshold {}%",
        config.analysis.fragment_window,
        config.analysis.fragment_step,
        config.analysis.similarity_threshold
    );
    println!();

    let engine = AnalysisEngine::from_config(&config);
    let report = engine
        .analyze(&text)
        .await
        .context("analysis failed")?;

    println!("Request: {}", report.request_id);
    println!("Originality: {}%", report.originality_percent);
    println!("AI-generated: {}%", report.ai_generated_percent);
    println!(
        "Fragments: {} total, {} checked, {} hits",
        report.fragments_total, report.fragments_checked, report.plagiarism_hits
    );
    println!("Elapsed: {} ms", report.elapsed_ms);

    if !report.matches.is_empty() {
        println!();
        println!("Matches:");
        for (i, m) in report.matches.iter().enumerate() {
            println!(
                "[M{:03}] {}%  {}",
                i,
                m.similarity_percent,
                m.url.as_deref().unwrap_or("(no url)")
            );
            println!("       {}", preview(&m.fragment, 120));
        }
    }

    if let Some(out_path) = out_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&out_path, json)
            .with_context(|| format!("failed to write report: {}", out_path))?;
        println!();
        println!("Wrote JSON: {}", out_path);
    }

    Ok(())
}
