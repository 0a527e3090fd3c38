//! Saída de terminal do auto-close: resumo colorido ou JSON.
//!
//! Usa a crate `console` para estilização com cores. O [`ReportPrinter`]
//! imprime o [`RunReport`] ao fim de cada execução.

use console::Style;

use crate::job::{RunOutcome, RunReport};

/// Imprime o relatório de uma execução no stdout.
pub struct ReportPrinter {
    // Estilo verde para pedidos fechados.
    green: Style,
    // Estilo vermelho para falhas.
    red: Style,
    // Estilo amarelo para pedidos ignorados e dry run.
    yellow: Style,
    dim: Style,
}

impl Default for ReportPrinter {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }
}

impl ReportPrinter {
    /// Imprime o relatório formatado em JSON.
    pub fn print_json(&self, report: &RunReport) {
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }

    /// Imprime o resumo legível: fechados, ignorados, falhas e resultado.
    pub fn print_summary(&self, report: &RunReport) {
        println!(
            "{}",
            self.dim.apply_to(format!(
                "run {} as {} (policy {}, cutoff {})",
                report.run_id, report.acting_principal, report.close_policy, report.cutoff
            ))
        );

        for name in &report.closed {
            println!("  {} {name} closed", self.green.apply_to("✓"));
        }
        if report.dry_run {
            for name in &report.to_close {
                println!("  {} {name} would be closed", self.yellow.apply_to("○"));
            }
        }
        for skipped in &report.skipped {
            println!(
                "  {} {} skipped: linked {}",
                self.yellow.apply_to("↷"),
                skipped.name,
                skipped.blocking_doctype
            );
        }
        for failure in &report.failures {
            println!(
                "  {} {} failed at {}: {}",
                self.red.apply_to("✗"),
                failure.name,
                failure.stage,
                failure.cause
            );
        }

        println!("{}", summary_line(report));
        if let Some(ms) = report.duration_ms() {
            println!("{}", self.dim.apply_to(format!("finished in {ms}ms")));
        }
    }
}

/// Uma linha com o resultado final da execução.
pub fn summary_line(report: &RunReport) -> String {
    match &report.outcome {
        RunOutcome::Failed(reason) => format!("Auto-close failed: {reason}"),
        RunOutcome::Pending => "Auto-close did not finish".to_string(),
        RunOutcome::Completed if report.candidates.is_empty() => {
            "No eligible sales orders found.".to_string()
        }
        RunOutcome::Completed if report.dry_run => format!(
            "Dry run: {} of {} candidates would be closed.",
            report.to_close.len(),
            report.candidates.len()
        ),
        RunOutcome::Completed => format!(
            "Auto-closed {} of {} candidates ({} skipped, {} failed).",
            report.closed.len(),
            report.candidates.len(),
            report.skipped.len(),
            report.failures.len()
        ),
    }
}
