//! Interface de linha de comando do sqlreview baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (review, clean, status)
//! e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// sqlreview: revisão de consultas SQL capturadas usando a API Z.ai.
#[derive(Debug, Parser)]
#[command(name = "sqlreview", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: sqlreview.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (nível debug, sem barra de progresso).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Revisa os arquivos SQL capturados.
    Review(ReviewArgs),

    /// Remove artefatos de execuções anteriores.
    Clean(CleanArgs),

    /// Mostra os pré-requisitos disponíveis para a revisão.
    Status,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ReviewArgs {
    /// Remove revisões anteriores antes de começar.
    #[arg(long)]
    pub clean: bool,

    /// Processa apenas os N primeiros arquivos.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Revisa apenas arquivos cujo nome contém o padrão (pode repetir).
    #[arg(long = "files", value_name = "PATTERN", num_args = 1..)]
    pub files: Vec<String>,

    /// Sobrescreve review.max_workers.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Sobrescreve review.max_retries.
    #[arg(long)]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CleanArgs {
    /// Limpa apenas os diretórios de saída.
    #[arg(long, conflicts_with_all = ["logs", "all"])]
    pub outputs: bool,

    /// Limpa apenas os arquivos de log.
    #[arg(long, conflicts_with = "all")]
    pub logs: bool,

    /// Limpa saídas e logs (padrão).
    #[arg(long)]
    pub all: bool,

    /// Apenas mostra o que seria removido.
    #[arg(long)]
    pub dry_run: bool,
}

impl CleanArgs {
    /// Sem flags explícitas, limpa tudo.
    pub fn targets(&self) -> (bool, bool) {
        if self.outputs || self.logs {
            (self.outputs, self.logs)
        } else {
            (true, true)
        }
    }
}
