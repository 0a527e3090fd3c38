//! Interface de linha de comando do auto-close baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, demo)
//! e flags globais (--config, --json, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::job::{ClosePolicy, JobSettings};

/// so-autoclose: fecha pedidos de venda inativos no ERP.
#[derive(Debug, Parser)]
#[command(name = "so-autoclose", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./autoclose.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Imprime o relatório da execução em JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Habilita logs detalhados (debug).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Política de fechamento aceita pela CLI, mapeada para [`ClosePolicy`] internamente.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Grava o status diretamente, ignorando validação e workflow.
    Force,
    /// Usa o caminho de atualização validado da plataforma.
    Workflow,
}

impl From<PolicyArg> for ClosePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Force => ClosePolicy::Force,
            PolicyArg::Workflow => ClosePolicy::Workflow,
        }
    }
}

/// Sobrescritas da configuração válidas para uma execução.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Janela de inatividade em dias.
    #[arg(long)]
    pub days: Option<u32>,

    /// Usuário em nome de quem o job executa.
    #[arg(long = "as", value_name = "PRINCIPAL")]
    pub acting_principal: Option<String>,

    /// Política de fechamento.
    #[arg(long)]
    pub policy: Option<PolicyArg>,

    /// Apenas lista o que seria fechado, sem gravar nada.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Aplica as flags informadas sobre os parâmetros vindos da configuração.
    pub fn apply(&self, settings: &mut JobSettings) {
        if let Some(days) = self.days {
            settings.days = days;
        }
        if let Some(principal) = &self.acting_principal {
            settings.acting_principal = principal.clone();
        }
        if let Some(policy) = self.policy {
            settings.close_policy = policy.into();
        }
        settings.dry_run = self.dry_run;
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o auto-close contra o site Frappe configurado.
    Run(RunArgs),

    /// Executa o auto-close contra um armazenamento em memória com dados de exemplo.
    Demo(RunArgs),
}
