use crate::adapters::ColumnMapping;
use crate::core::query::DEFAULT_LIMIT;
use crate::core::scenario::ScenarioSpec;
use crate::core::ConfigProvider;
use crate::utils::error::{FlowError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default)]
    pub server: ServerConfig,
    pub monitoring: Option<MonitoringConfig>,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub flows: String,
    pub lookup_areas: String,
    pub processed_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub default_limit: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            default_limit: DEFAULT_LIMIT as i64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FlowError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FlowError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| FlowError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("paths.flows", &self.paths.flows)?;
        validation::validate_file_extension("paths.flows", &self.paths.flows, &["csv"])?;
        validation::validate_path("paths.lookup_areas", &self.paths.lookup_areas)?;
        validation::validate_file_extension("paths.lookup_areas", &self.paths.lookup_areas, &["csv"])?;
        validation::validate_path("paths.processed_dir", &self.paths.processed_dir)?;

        for (field, value) in [
            ("columns.origin_code", &self.columns.origin_code),
            ("columns.origin_name", &self.columns.origin_name),
            ("columns.dest_code", &self.columns.dest_code),
            ("columns.dest_name", &self.columns.dest_name),
            ("columns.count", &self.columns.count),
        ] {
            validation::validate_non_empty_string(field, value)?;
        }

        validation::validate_non_empty_string("server.host", &self.server.host)?;
        validation::validate_positive_number("server.default_limit", self.server.default_limit, 1)?;

        // 場景名稱就是輸出檔名，不能重複
        let mut seen = HashSet::new();
        for scenario in &self.export.scenarios {
            if !seen.insert(scenario.name.as_str()) {
                return Err(FlowError::InvalidConfigValueError {
                    field: "export.scenarios.name".to_string(),
                    value: scenario.name.clone(),
                    reason: "Scenario names must be unique".to_string(),
                });
            }
        }

        Ok(())
    }

    /// `--only` 指定的場景 (保持宣告順序)；空清單代表全部
    pub fn select_scenarios(&self, only: &[String]) -> Result<Vec<ScenarioSpec>> {
        let all = &self.export.scenarios;
        if only.is_empty() {
            return Ok(all.clone());
        }
        if let Some(unknown) = only.iter().find(|name| !all.iter().any(|s| &s.name == *name)) {
            return Err(FlowError::InvalidConfigValueError {
                field: "--only".to_string(),
                value: unknown.clone(),
                reason: "No scenario with this name in [[export.scenarios]]".to_string(),
            });
        }
        Ok(all
            .iter()
            .filter(|s| only.contains(&s.name))
            .cloned()
            .collect())
    }

    pub fn default_limit(&self) -> usize {
        usize::try_from(self.server.default_limit).unwrap_or(DEFAULT_LIMIT)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn flows_path(&self) -> &str {
        &self.paths.flows
    }

    fn lookup_path(&self) -> &str {
        &self.paths.lookup_areas
    }

    fn processed_dir(&self) -> &str {
        &self.paths.processed_dir
    }

    fn scenarios(&self) -> &[ScenarioSpec] {
        &self.export.scenarios
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
