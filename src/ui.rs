//! Interface de terminal do sqlreview: barra de progresso e resumo colorido.
//!
//! Usa `indicatif` para o progresso da etapa e `console` para estilizar o
//! resumo final de cada execução.

use std::path::Path;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::executor::StageReport;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";

/// Barra de progresso para `total` itens. Fica oculta quando `visible` é falso
/// (modo verbose ou console desativado), para não disputar o terminal com os logs.
pub fn progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb
}

/// Formata durações como `45.20s` ou, acima de um minuto, `2m 5.30s`.
pub fn format_elapsed(secs: f64) -> String {
    if secs >= 60.0 {
        let minutes = (secs / 60.0).floor();
        format!("{minutes:.0}m {:.2}s", secs - minutes * 60.0)
    } else {
        format!("{secs:.2}s")
    }
}

/// Linhas do resumo de execução, sem estilo.
pub fn summary_lines(report: &StageReport, review_dir: &Path) -> Vec<String> {
    let s = &report.snapshot;
    let t = &s.tokens;
    let mut lines = vec![
        format!("Run ID: {}", report.run_id),
        format!("Total files: {}", s.total_items),
        format!("Successful: {} (bypassed: {})", s.successful, s.bypassed),
        format!("Skipped: {} (duplicates: {})", s.skipped, s.duplicates),
        format!("Failed: {}", s.failed),
    ];
    for (name, reason) in report.failures() {
        lines.push(format!("  {name}: {reason}"));
    }
    lines.push(format!(
        "Total retries: {} (transport: {}, processing: {})",
        s.total_retries, s.transport_retries, s.processing_retries
    ));
    lines.push(format!(
        "Tokens: prompt={} completion={} total={} reasoning={} cached={}",
        t.prompt, t.completion, t.total, t.reasoning, t.cached
    ));
    let effective = s.effective_tokens();
    lines.push(format!("Effective tokens (excluding cache hits): {effective}"));
    if let Some(rate) = s.cache_hit_rate() {
        lines.push(format!("Cache hit rate: {rate:.1}%"));
    }
    let elapsed = format_elapsed(s.elapsed_secs);
    lines.push(format!("Execution time: {elapsed}"));
    if let Some(rate) = s.success_rate() {
        lines.push(format!("Success rate: {rate:.1}%"));
    }
    lines.push(format!("Review directory: {}", review_dir.display()));
    lines
}

/// Imprime o resumo com cores: verde para sucessos, amarelo para itens
/// ignorados e vermelho para falhas.
pub fn print_summary(report: &StageReport, review_dir: &Path) {
    let title = Style::new().cyan().bold();
    let green = Style::new().green().bold();
    let yellow = Style::new().yellow();
    let red = Style::new().red().bold();
    let has_failures = report.snapshot.failed > 0;

    println!();
    println!("{}", title.apply_to("─── Review Summary ───"));
    for line in summary_lines(report, review_dir) {
        let styled = if line.starts_with("Successful") {
            green.apply_to(line)
        } else if line.starts_with("Skipped") {
            yellow.apply_to(line)
        } else if line.starts_with(' ') || (has_failures && line.starts_with("Failed")) {
            red.apply_to(line)
        } else {
            Style::new().apply_to(line)
        };
        println!("  {styled}");
    }
}
