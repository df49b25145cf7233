use anyhow::{bail, Context};
use clap::Parser;
use fit_squeeze::cli::{Args, Commands};
use fit_squeeze::constants::{
    COMPRESSED_SIZE_PREFIX, COMPRESSION_RATIO_PREFIX, ERROR_PREFIX, ORIGINAL_SIZE_PREFIX,
    PROGRESS_BAR_TEMPLATE, SUCCESS_PREFIX, WARNING_PREFIX,
};
use fit_squeeze::info::print_media_info;
use fit_squeeze::logger::{init_logging, install_panic_hook, is_quiet, is_verbose};
use fit_squeeze::utils::{calculate_compression_ratio, unique_export_name};
use fit_squeeze::validation::prepare_output_dir;
use fit_squeeze::{
    collect_all_inputs, error, format_file_size, get_media_info, info,
    load_source_file, verbose, warn, BatchOrchestrator, BatchSummary, Engine, ItemId, ItemStatus,
    ProgressEvent, QueueItem, SearchTuning, TargetPolicy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.quiet, args.verbose);
    install_panic_hook();

    match args.command {
        Commands::Compress {
            inputs,
            output,
            target_kb,
            tuning,
            recursive,
        } => run_compress(&inputs, &output, target_kb, tuning.as_deref(), recursive),
        Commands::Info { input, target_kb } => show_media_info(&input, target_kb),
    }
}

fn load_tuning(path: Option<&Path>) -> anyhow::Result<SearchTuning> {
    match path {
        Some(path) => SearchTuning::from_json_file(path)
            .with_context(|| format!("Failed to load tuning from {:?}", path)),
        None => Ok(SearchTuning::default()),
    }
}

fn run_compress(
    inputs: &[String],
    output: &Path,
    target_kb: u64,
    tuning: Option<&Path>,
    recursive: bool,
) -> anyhow::Result<()> {
    let engine = Engine::new(load_tuning(tuning)?)?;
    let policy = TargetPolicy::from_kb(target_kb)?;
    let output_dir = prepare_output_dir(output)
        .with_context(|| format!("Failed to create output directory {:?}", output))?;

    info!("🚀 Starting compression...");
    info!("📁 Output: {:?}", output_dir);

    let paths = collect_all_inputs(inputs, recursive)?;
    let mut orchestrator = BatchOrchestrator::with_compressor(engine);
    let mut rejected = 0;
    for path in &paths {
        match load_source_file(path) {
            Ok(source) => {
                orchestrator.add_file(source);
            }
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                rejected += 1;
            }
        }
    }

    if orchestrator.is_empty() {
        warn!("No supported files to process");
        return Ok(());
    }

    info!("📊 Found {} files to process", orchestrator.len());
    if rejected > 0 {
        info!("  ⏭️  Skipped: {}", rejected);
    }
    info!(
        "🎯 Target: {} per file",
        format_file_size(policy.user_target_bytes() as f64)
    );

    let names: HashMap<ItemId, String> = orchestrator
        .items()
        .iter()
        .map(|item| (item.id(), item.name().to_string()))
        .collect();

    let progress = if is_quiet() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(orchestrator.len() as u64)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template(PROGRESS_BAR_TEMPLATE)?
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    let mut summary = BatchSummary::default();

    for event in orchestrator.run(policy)? {
        match event {
            ProgressEvent::Started { id, .. } => {
                progress.set_message(names.get(&id).cloned().unwrap_or_default());
            }
            ProgressEvent::Finished {
                id,
                status,
                result_size,
                ..
            } => {
                progress.inc(1);
                if is_verbose() {
                    let size = result_size
                        .map(|size| format_file_size(size as f64))
                        .unwrap_or_else(|| "-".to_string());
                    progress.println(format!(
                        "🔍 {}: {} ({})",
                        names.get(&id).map(String::as_str).unwrap_or_default(),
                        status,
                        size
                    ));
                }
            }
            ProgressEvent::Completed(done) => summary = done,
        }
    }
    progress.finish_and_clear();

    let mut export_names = HashSet::new();
    for item in orchestrator.items() {
        report_item(item, &output_dir, &mut export_names)?;
    }

    print_summary(&summary, start_time);

    if summary.failed > 0 {
        bail!("{} of {} files failed", summary.failed, summary.processed());
    }
    Ok(())
}

fn report_item(
    item: &QueueItem,
    output_dir: &Path,
    export_names: &mut HashSet<String>,
) -> anyhow::Result<()> {
    let Some(bytes) = item.result_bytes() else {
        error!(
            "Failed to process {}: {}",
            item.name(),
            item.error_message().unwrap_or("unknown error")
        );
        return Ok(());
    };

    let output_path: PathBuf = output_dir.join(unique_export_name(item.name(), export_names));
    fs::write(&output_path, bytes)
        .with_context(|| format!("Failed to write {:?}", output_path))?;

    let prefix = match item.status() {
        ItemStatus::Warning => WARNING_PREFIX,
        ItemStatus::Failed => ERROR_PREFIX,
        _ => SUCCESS_PREFIX,
    };
    info!(
        "{} {} -> {}: {} -> {} ({})",
        prefix,
        item.name(),
        output_path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default(),
        format_file_size(item.source_size() as f64),
        format_file_size(bytes.len() as f64),
        item.status()
    );
    if item.rolled_back() {
        verbose!("{}: no improvement, kept original bytes", item.name());
    } else {
        verbose!(
            "{}: {:.1}% smaller, written as {}",
            item.name(),
            calculate_compression_ratio(item.source_size(), bytes.len() as u64),
            item.result_media_type()
        );
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary, start_time: Instant) {
    info!("\n🎉 Compression completed!");
    info!("  {} Done: {}", SUCCESS_PREFIX, summary.done);
    info!("  {}  Limit reached: {}", WARNING_PREFIX, summary.warning);
    info!("  {} Failed: {}", ERROR_PREFIX, summary.failed);
    info!(
        "{} {}",
        ORIGINAL_SIZE_PREFIX,
        format_file_size(summary.total_original_bytes as f64)
    );
    info!(
        "{} {}",
        COMPRESSED_SIZE_PREFIX,
        format_file_size(summary.total_result_bytes as f64)
    );
    info!(
        "{} {} ({}%)",
        COMPRESSION_RATIO_PREFIX,
        format_file_size(summary.saved_bytes() as f64),
        summary.percent_saved()
    );
    info!("⏱️  Time: {:.2?}", start_time.elapsed());
}

fn show_media_info(input: &Path, target_kb: u64) -> anyhow::Result<()> {
    let policy = TargetPolicy::from_kb(target_kb)?;
    let engine = Engine::default();
    let media = get_media_info(input).with_context(|| format!("Failed to inspect {:?}", input))?;
    print_media_info(input, &media, &policy, &engine);
    Ok(())
}
