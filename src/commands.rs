//! Handlers behind each CLI subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use console::Style;
use tracing::{error, info, warn};

use crate::cleanup::{self, DirCleanup};
use crate::cli::{CleanArgs, ReviewArgs};
use crate::config::SqlReviewConfig;
use crate::error::PipelineError;
use crate::executor::StageExecutor;
use crate::items::{self, WorkItemSource};
use crate::review::{CompanionReader, ReviewInputs, ReviewSettings, ReviewWorkflow};
use crate::sink::{OutputDirectoryManager, ResultSink};
use crate::stats::StatsAggregator;
use crate::ui;
use crate::zai::{CallAdapter, ZaiClient};

/// Counts of the inputs and outputs a review run depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisites {
    pub sql_dir: PathBuf,
    pub sql_files: usize,
    pub sql_info_files: usize,
    pub metadata_files: usize,
    pub review_files: usize,
    pub prompt_present: bool,
    pub api_key_present: bool,
}

impl Prerequisites {
    pub fn gather(config: &SqlReviewConfig) -> Result<Self, PipelineError> {
        let sql_dir = config.sql_dir();
        let sql_files = if sql_dir.is_dir() {
            let source = WorkItemSource::new(&sql_dir, &config.review.file_pattern)?;
            source.list()?.len()
        } else {
            0
        };
        Ok(Self {
            sql_dir,
            sql_files,
            sql_info_files: CompanionReader::new(config.sql_info_dir()).count(),
            metadata_files: CompanionReader::new(config.metadata_dir()).count(),
            review_files: CompanionReader::new(config.review_dir()).count(),
            prompt_present: config.review.system_prompt_file.is_file(),
            api_key_present: !config.review.api_key.trim().is_empty(),
        })
    }
}

/// `review`: runs the review stage over the captured SQL files.
pub async fn review(config: &SqlReviewConfig, args: &ReviewArgs, verbose: bool) -> Result<()> {
    let mut config = config.clone();
    if let Some(workers) = args.workers {
        config.review.max_workers = workers;
    }
    if let Some(max_retries) = args.max_retries {
        config.review.max_retries = max_retries;
    }
    config.validate()?;

    let prereq = Prerequisites::gather(&config)?;
    if prereq.sql_files == 0 {
        let msg = format!("No SQL files found in {}", prereq.sql_dir.display());
        return Err(PipelineError::Config(msg).into());
    }
    info!("Found {} SQL files", prereq.sql_files);
    if prereq.metadata_files == 0 {
        warn!(
            "No metadata files found in {}; review will proceed without metadata",
            config.metadata_dir().display()
        );
    }

    let review = &config.review;
    let prompt_path = &review.system_prompt_file;
    if !prompt_path.is_file() {
        return Err(PipelineError::MissingPrompt(prompt_path.clone()).into());
    }
    let system_prompt = std::fs::read_to_string(prompt_path)
        .with_context(|| format!("failed to read {}", prompt_path.display()))?;

    let review_dir = config.review_dir();
    OutputDirectoryManager::reset_if_requested(&review_dir, args.clean)
        .with_context(|| format!("failed to prepare {}", review_dir.display()))?;

    info!("Review directory: {}", review_dir.display());
    info!("API URL: {}", review.api_url);
    info!("Model: {}", review.model);
    info!("Max retries: {}", review.max_retries);
    info!("Max parallel workers: {}", review.max_workers);

    let source = WorkItemSource::new(config.sql_dir(), &review.file_pattern)?;
    let selected = items::select(source.list()?, &args.files, args.limit);
    if selected.is_empty() {
        if args.files.is_empty() {
            warn!("No SQL files found in {}", config.sql_dir().display());
        } else {
            let patterns = args.files.join(", ");
            error!("No SQL files match the specified patterns: {patterns}");
        }
        return Ok(());
    }
    info!("Found {} SQL files to review", selected.len());

    let stats = Arc::new(StatsAggregator::new());
    let policy = review.retry_policy();
    let client = ZaiClient::new(
        review.api_key.clone(),
        review.api_url.clone(),
        review.request_timeout(),
    )
    .map_err(PipelineError::from)?;
    let workflow = Arc::new(ReviewWorkflow::new(
        CallAdapter::new(client, policy, stats.clone()),
        ResultSink::new(&review_dir),
        ReviewInputs {
            sql_info: CompanionReader::new(config.sql_info_dir()),
            metadata: CompanionReader::new(config.metadata_dir()),
        },
        ReviewSettings {
            model: review.model.clone(),
            system_prompt,
            max_tokens: review.max_tokens,
            temperature: review.temperature,
            bypass_assessment: review.bypass_assessment.clone(),
            processing_policy: policy,
        },
    ));

    let show_progress = config.logging.console_output && !verbose;
    let executor = StageExecutor::new(review.max_workers, stats)
        .with_progress(ui::progress_bar(selected.len(), show_progress));
    let report = executor.run(workflow, selected).await;

    let s = &report.snapshot;
    info!(
        run_id = %report.run_id,
        successful = s.successful,
        skipped = s.skipped,
        failed = s.failed,
        total_retries = s.total_retries,
        tokens = s.tokens.total,
        "Review run finished"
    );
    ui::print_summary(&report, &review_dir);
    Ok(())
}

/// `clean`: removes outputs and/or logs of earlier runs.
pub fn clean(config: &SqlReviewConfig, args: &CleanArgs) -> Result<()> {
    let (outputs, logs) = args.targets();
    let bold = Style::new().bold();
    let tick = Style::new().green().apply_to("✓");
    let verb = if args.dry_run {
        "Would delete"
    } else {
        "Deleted"
    };

    if args.dry_run {
        let banner = bold.apply_to("DRY RUN MODE - No files will be deleted");
        println!("{banner}");
    }

    let mut output_files = 0;
    if outputs {
        println!("{}", bold.apply_to("Cleaning Outputs"));
        let report = cleanup::clean_outputs(&config.output.base_dir, args.dry_run)?;
        for dir in report.iter().filter(|d| d.count() > 0) {
            let name = dir_name(&dir.dir);
            println!("  {tick} {verb}: {} files in {name}/", dir.count());
            if args.dry_run {
                print_examples(dir);
            }
        }
        output_files = report.iter().map(DirCleanup::count).sum();
    }

    let mut log_files = 0;
    if logs {
        println!("{}", bold.apply_to("Cleaning Logs"));
        let report = cleanup::clean_logs(config.logs_dir(), args.dry_run)?;
        for file in &report.files {
            println!("  {tick} {verb}: {}", dir_name(file));
        }
        log_files = report.count();
    }

    println!();
    println!("{verb}:");
    println!("  - {output_files} output files (directories preserved)");
    println!("  - {log_files} log files");
    let total = output_files + log_files;
    println!("{}", bold.apply_to(format!("Total: {total} files")));
    Ok(())
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_examples(dir: &DirCleanup) {
    for file in dir.files.iter().take(3) {
        println!("    - {}", dir_name(file));
    }
    if dir.count() > 3 {
        println!("    ... and {} more", dir.count() - 3);
    }
}

/// `status`: reports which review prerequisites are in place.
pub fn status(config: &SqlReviewConfig) -> Result<()> {
    let p = Prerequisites::gather(config)?;
    let ok = Style::new().green().apply_to("✓");
    let warn_mark = Style::new().yellow().apply_to("⚠");
    let bad = Style::new().red().apply_to("✗");

    let sql_dir = p.sql_dir.display();
    let prompt = config.review.system_prompt_file.display();

    let bold = Style::new().bold();
    println!("{}", bold.apply_to("Checking prerequisites"));
    if p.sql_files > 0 {
        println!("  {ok} Found {} SQL files in {sql_dir}", p.sql_files);
    } else {
        println!("  {bad} No SQL files found in {sql_dir}");
    }
    println!("  {ok} Found {} execution info records", p.sql_info_files);
    if p.metadata_files > 0 {
        println!("  {ok} Found {} metadata files", p.metadata_files);
    } else {
        println!("  {warn_mark} No metadata files found; review will proceed without metadata");
    }
    println!("  {ok} Found {} existing reviews", p.review_files);
    if p.prompt_present {
        println!("  {ok} System prompt: {prompt}");
    } else {
        println!("  {bad} System prompt missing: {prompt}");
    }
    if p.api_key_present {
        println!("  {ok} ZAI_API_KEY is set");
    } else {
        println!("  {bad} ZAI_API_KEY is not set");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use tempfile::TempDir;

    fn config_in(root: &Path) -> SqlReviewConfig {
        let mut config = SqlReviewConfig::default();
        config.output.base_dir = root.join("outputs");
        config.output.logs_dir = root.join("logs");
        config.review.system_prompt_file = root.join("prompt.txt");
        config.review.api_key = "zai-test".into();
        config
    }

    #[test]
    fn prerequisites_count_each_input() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());
        fs::create_dir_all(config.sql_dir()).unwrap();
        fs::create_dir_all(config.sql_info_dir()).unwrap();
        fs::write(config.sql_dir().join("A___T__1.sql"), "SELECT 1").unwrap();
        fs::write(config.sql_dir().join("A___T__2.sql"), "SELECT 2").unwrap();
        fs::write(config.sql_info_dir().join("A___T__1.json"), "{}").unwrap();
        fs::write(tmp.path().join("prompt.txt"), "review").unwrap();

        let p = Prerequisites::gather(&config).unwrap();

        assert_eq!(p.sql_files, 2);
        assert_eq!(p.sql_info_files, 1);
        assert_eq!(p.metadata_files, 0);
        assert_eq!(p.review_files, 0);
        assert!(p.prompt_present);
        assert!(p.api_key_present);
    }

    #[tokio::test]
    async fn review_without_sql_files_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());

        let args = ReviewArgs::default();
        let err = review(&config, &args, false).await.unwrap_err();

        let err = err.downcast::<PipelineError>().unwrap();
        assert!(err.is_config());
        assert!(err.to_string().contains("No SQL files found"));
    }

    #[tokio::test]
    async fn review_without_api_key_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut config = config_in(tmp.path());
        config.review.api_key.clear();

        let args = ReviewArgs::default();
        let err = review(&config, &args, false).await.unwrap_err();
        assert!(err.downcast::<PipelineError>().unwrap().is_config());
    }

    #[tokio::test]
    async fn review_without_prompt_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());
        fs::create_dir_all(config.sql_dir()).unwrap();
        fs::write(config.sql_dir().join("A___T__1.sql"), "SELECT 1").unwrap();

        let args = ReviewArgs::default();
        let err = review(&config, &args, false).await.unwrap_err();
        assert!(matches!(
            err.downcast::<PipelineError>().unwrap(),
            PipelineError::MissingPrompt(_)
        ));
    }

    #[tokio::test]
    async fn unmatched_filter_ends_run_without_work() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());
        fs::create_dir_all(config.sql_dir()).unwrap();
        fs::write(config.sql_dir().join("A___T__1.sql"), "SELECT 1").unwrap();
        fs::write(tmp.path().join("prompt.txt"), "review").unwrap();
        let args = ReviewArgs {
            files: vec!["nothing-matches".into()],
            ..ReviewArgs::default()
        };

        review(&config, &args, false).await.unwrap();

        assert!(config.review_dir().is_dir());
        assert_eq!(fs::read_dir(config.review_dir()).unwrap().count(), 0);
    }

    #[test]
    fn clean_dry_run_keeps_files() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());
        fs::create_dir_all(config.review_dir()).unwrap();
        fs::create_dir_all(config.logs_dir()).unwrap();
        fs::write(config.review_dir().join("a.json"), "{}").unwrap();
        fs::write(config.logs_dir().join("review_20250101_000000.log"), "x").unwrap();

        let dry_run = CleanArgs {
            dry_run: true,
            ..CleanArgs::default()
        };
        clean(&config, &dry_run).unwrap();
        assert!(config.review_dir().join("a.json").exists());

        clean(&config, &CleanArgs::default()).unwrap();
        assert!(!config.review_dir().join("a.json").exists());
        let log = config.logs_dir().join("review_20250101_000000.log");
        assert!(!log.exists());
    }
}
