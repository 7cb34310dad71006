use anyhow::Result;
use clap::Parser;
use serde_json::json;
use srcgraph::engine::language::{Language, ALL_LANGUAGES};
use srcgraph::engine::pool::{FileTask, ParsePool};
use srcgraph::engine::scan::{scan_repo_with_options, ScanOptions};
use srcgraph::engine::{cfg, Engine};
use srcgraph::model::{AnalysisStatus, AnalyzeStats};
use srcgraph::{cli, config, util};
use std::path::PathBuf;
use std::time::Instant;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    match args.command {
        cli::Command::Analyze {
            repo,
            jobs,
            no_ignore,
        } => analyze(repo, jobs, no_ignore),
        cli::Command::File { path, repo } => analyze_single(path, repo),
        cli::Command::Cfg {
            path,
            start_line,
            end_line,
        } => build_cfg(path, start_line, end_line),
        cli::Command::Languages => {
            let listing: Vec<_> = ALL_LANGUAGES
                .iter()
                .map(|lang| json!({ "id": lang.id(), "extensions": lang.extensions() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
            Ok(())
        }
    }
}

/// Scan the repository and stream one JSON analysis per line to stdout;
/// summary stats go to stderr so piped consumers see only results.
fn analyze(repo: PathBuf, jobs: Option<usize>, no_ignore: bool) -> Result<()> {
    let started = Instant::now();
    let files = scan_repo_with_options(&repo, ScanOptions::new(no_ignore))?;

    let mut stats = AnalyzeStats {
        scanned: files.len(),
        ..Default::default()
    };

    let tasks: Vec<FileTask> = files
        .iter()
        .map(|file| FileTask {
            absolute_path: file.abs_path.clone(),
            relative_path: file.rel_path.clone(),
        })
        .collect();

    let mut pool = ParsePool::new(jobs.unwrap_or(config::Config::get().pool_size));
    pool.parse_files(tasks, 0, |result, _completed, _total| match &result.analysis {
        Ok(analysis) => {
            if analysis.status == AnalysisStatus::Ok {
                stats.parsed += 1;
                stats.spans += analysis.span_count();
                stats.occurrences += analysis.occurrences.len();
                stats.relationships += analysis.inheritance.len();
            } else {
                stats.failed += 1;
            }
            match serde_json::to_string(analysis) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("srcgraph: serialize {}: {err}", result.relative_filename),
            }
        }
        Err(err) => {
            stats.failed += 1;
            eprintln!("srcgraph: {}: {err}", result.relative_filename);
        }
    })?;
    pool.shutdown();

    stats.duration_ms = started.elapsed().as_millis() as u64;
    eprintln!("{}", serde_json::to_string(&stats)?);
    Ok(())
}

fn analyze_single(path: PathBuf, repo: PathBuf) -> Result<()> {
    let relative = util::normalize_rel_path(&repo, &path)
        .unwrap_or_else(|_| util::normalize_path(&path));
    let mut engine = Engine::new();
    let analysis = engine.analyze_file(&path, &relative)?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn build_cfg(path: PathBuf, start_line: i64, end_line: i64) -> Result<()> {
    let source = util::read_to_string(&path)?;
    let function_source = util::slice_lines(&source, start_line, end_line);
    let language = Language::from_filename_lossy(&path.to_string_lossy());
    let graph = cfg::build_cfg(&function_source, language, start_line, end_line)?;
    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}
