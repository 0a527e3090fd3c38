//! Configuração do auto-close carregada a partir de `autoclose.toml`.
//!
//! A struct [`AutoCloseConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `FRAPPE_URL`, `FRAPPE_API_KEY`,
//! `FRAPPE_API_SECRET` e `FRAPPE_FORCE_UPDATE_METHOD` têm precedência sobre
//! o arquivo.
//!
//! As requisições ao Frappe rodam como o dono da API key; o
//! `acting_principal` só aparece como autor dos comentários.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

use crate::domain::LinkKind;
use crate::job::{ClosePolicy, JobSettings};
use crate::store::FrappeSettings;

/// Arquivo procurado no diretório atual quando `--config` não é informado.
pub const DEFAULT_CONFIG_FILE: &str = "autoclose.toml";

/// Configuração de nível superior carregada de `autoclose.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoCloseConfig {
    /// Janela de inatividade em dias.
    #[serde(default = "default_days")]
    pub days: u32,

    /// Usuário em nome de quem o job executa; registrado nos comentários.
    #[serde(default = "default_acting_principal")]
    pub acting_principal: String,

    /// Política de fechamento: `force` (padrão) ou `workflow`.
    #[serde(default)]
    pub close_policy: ClosePolicy,

    #[serde(default = "default_order_doctype")]
    pub order_doctype: String,

    /// Campo customizado de opt-in no pedido.
    #[serde(default = "default_autoclose_field")]
    pub autoclose_field: String,

    /// Documentos vinculados que impedem o fechamento, na ordem de verificação.
    #[serde(default = "LinkKind::defaults")]
    pub link_kinds: Vec<LinkKind>,

    /// Conexão com o site Frappe/ERPNext.
    #[serde(default)]
    pub frappe: FrappeSettings,
}

// Valor padrão da janela: 60 dias.
fn default_days() -> u32 {
    60
}

// Valor padrão do usuário: "Administrator".
fn default_acting_principal() -> String {
    "Administrator".to_string()
}

fn default_order_doctype() -> String {
    "Sales Order".to_string()
}

fn default_autoclose_field() -> String {
    "autoclose_after_60_days".to_string()
}

impl Default for AutoCloseConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            acting_principal: default_acting_principal(),
            close_policy: ClosePolicy::default(),
            order_doctype: default_order_doctype(),
            autoclose_field: default_autoclose_field(),
            link_kinds: LinkKind::defaults(),
            frappe: FrappeSettings::default(),
        }
    }
}

impl AutoCloseConfig {
    /// Carrega a configuração do caminho informado ou de `autoclose.toml`.
    ///
    /// Sem caminho explícito, usa valores padrão se o arquivo não existir.
    /// Um caminho explícito inexistente é erro.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str::<AutoCloseConfig>(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Aplica variáveis de ambiente não vazias sobre os valores do arquivo.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(url) = non_empty("FRAPPE_URL") {
            self.frappe.base_url = url;
        }
        if let Some(key) = non_empty("FRAPPE_API_KEY") {
            self.frappe.api_key = key;
        }
        if let Some(secret) = non_empty("FRAPPE_API_SECRET") {
            self.frappe.api_secret = secret;
        }
        if let Some(method) = non_empty("FRAPPE_FORCE_UPDATE_METHOD") {
            self.frappe.force_update_method = Some(method);
        }
    }

    /// Verifica se a política escolhida pode rodar contra o Frappe.
    ///
    /// `force` exige um `force_update_method` que grave direto no banco;
    /// sem ele o fechamento passaria pela validação normal.
    pub fn check_close_policy(&self, policy: ClosePolicy) -> Result<()> {
        let configured = self
            .frappe
            .force_update_method
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty());
        if policy == ClosePolicy::Force && !configured {
            bail!(
                "close_policy \"force\" needs frappe.force_update_method: a whitelisted \
                 method that writes with frappe.db.set_value (frappe.client.set_value \
                 validates); set it or use --policy workflow"
            );
        }
        Ok(())
    }

    /// Parâmetros de execução do job derivados desta configuração.
    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            days: self.days,
            acting_principal: self.acting_principal.clone(),
            close_policy: self.close_policy,
            order_doctype: self.order_doctype.clone(),
            autoclose_field: self.autoclose_field.clone(),
            link_kinds: self.link_kinds.clone(),
            dry_run: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let config = AutoCloseConfig::default();
        assert_eq!(config.days, 60);
        assert_eq!(config.acting_principal, "Administrator");
        assert_eq!(config.close_policy, ClosePolicy::Force);
        assert_eq!(config.autoclose_field, "autoclose_after_60_days");
        assert_eq!(config.link_kinds, LinkKind::defaults());
        assert!(config.frappe.api_key.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            days = 90
            close_policy = "workflow"

            [frappe]
            base_url = "https://erp.example.com"
            api_key = "abc"
        "#;
        let config: AutoCloseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.days, 90);
        assert_eq!(config.close_policy, ClosePolicy::Workflow);
        assert_eq!(config.acting_principal, "Administrator");
        assert_eq!(config.frappe.base_url, "https://erp.example.com");
        assert_eq!(config.frappe.api_key, "abc");
        assert_eq!(config.frappe.force_update_method, None);
        assert_eq!(config.link_kinds.len(), 4);
    }

    #[test]
    fn custom_link_kinds_replace_defaults() {
        let toml_str = r#"
            [[link_kinds]]
            doctype = "Delivery Note"
            link_field = "against_sales_order"

            [[link_kinds]]
            doctype = "Payment Entry"
            link_field = "reference_name"
        "#;
        let config: AutoCloseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.link_kinds,
            vec![
                LinkKind::new("Delivery Note", "against_sales_order"),
                LinkKind::new("Payment Entry", "reference_name"),
            ]
        );
    }

    #[test]
    fn load_reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "days = 45\nacting_principal = \"jobs@example.com\"").unwrap();

        let config = AutoCloseConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.days, 45);
        assert_eq!(config.acting_principal, "jobs@example.com");
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AutoCloseConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "days = \"sixty\"").unwrap();
        let err = AutoCloseConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AutoCloseConfig::default();
        config.frappe.api_key = "from-file".into();
        let env: HashMap<&str, &str> = HashMap::from([
            ("FRAPPE_URL", "https://env.example.com"),
            ("FRAPPE_API_KEY", "from-env"),
            ("FRAPPE_API_SECRET", ""),
            ("FRAPPE_FORCE_UPDATE_METHOD", "autoclose.api.force_set_value"),
        ]);

        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.frappe.base_url, "https://env.example.com");
        assert_eq!(config.frappe.api_key, "from-env");
        // Empty values are ignored.
        assert!(config.frappe.api_secret.is_empty());
        assert_eq!(
            config.frappe.force_update_method.as_deref(),
            Some("autoclose.api.force_set_value")
        );
    }

    #[test]
    fn force_policy_requires_force_update_method() {
        let config = AutoCloseConfig::default();
        let err = config.check_close_policy(ClosePolicy::Force).unwrap_err();
        assert!(err.to_string().contains("force_update_method"));

        let blank: AutoCloseConfig = toml::from_str("[frappe]\nforce_update_method = \"\"").unwrap();
        assert!(blank.check_close_policy(ClosePolicy::Force).is_err());

        // The validated path needs no server method.
        assert!(config.check_close_policy(ClosePolicy::Workflow).is_ok());
    }

    #[test]
    fn force_policy_accepts_configured_method() {
        let toml_str = r#"
            [frappe]
            force_update_method = "autoclose.api.force_set_value"
        "#;
        let config: AutoCloseConfig = toml::from_str(toml_str).unwrap();
        assert!(config.check_close_policy(ClosePolicy::Force).is_ok());
    }

    #[test]
    fn job_settings_mirror_config() {
        let config = AutoCloseConfig {
            days: 14,
            close_policy: ClosePolicy::Workflow,
            ..Default::default()
        };
        let settings = config.job_settings();
        assert_eq!(settings.days, 14);
        assert_eq!(settings.close_policy, ClosePolicy::Workflow);
        assert!(!settings.dry_run);
    }
}
