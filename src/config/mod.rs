use crate::core::{StatsError, StatsResult};
use crate::stats::GridMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 统计收集配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StatisticsConfig {
    /// 统计目标，决定直方图桶数和网格格子数
    pub target: usize,
    /// 网格直方图模式
    pub grid_mode: GridMode,
    /// 每个统计目标单位对应的样本行数
    pub rows_per_target: usize,
    /// 采样随机种子，不设置时使用系统熵
    pub seed: Option<u64>,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            target: 100,
            grid_mode: GridMode::Nd,
            rows_per_target: 300,
            seed: None,
        }
    }
}

/// 日志配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "tempstats".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub statistics: StatisticsConfig,
    pub log: LogConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> StatsResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| StatsError::Config(format!("读取 {} 失败: {}", path.display(), e)))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| StatsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> StatsResult<()> {
        let path = path.as_ref();
        let content =
            toml::to_string_pretty(self).map_err(|e| StatsError::Config(e.to_string()))?;
        fs::write(path, content)
            .map_err(|e| StatsError::Config(format!("写入 {} 失败: {}", path.display(), e)))?;
        Ok(())
    }

    pub fn validate(&self) -> StatsResult<()> {
        if self.statistics.target == 0 {
            return Err(StatsError::Config("统计目标必须大于 0".to_string()));
        }
        if self.statistics.rows_per_target == 0 {
            return Err(StatsError::Config("每单位样本行数必须大于 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.statistics.target, 100);
        assert_eq!(config.statistics.rows_per_target, 300);
        assert_eq!(config.statistics.grid_mode, GridMode::Nd);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_config_load_save() {
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");

        let mut config = Config::default();
        config.statistics.target = 20;
        config.statistics.grid_mode = GridMode::TwoD;
        config.statistics.seed = Some(7);
        config.save(temp_file.path()).expect("Failed to save config");

        let loaded = Config::load(temp_file.path()).expect("Failed to load config");
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        temp_file
            .write_all(b"[statistics]\ntarget = 10\ngrid_mode = \"2d\"\n")
            .expect("Failed to write config");

        let loaded = Config::load(temp_file.path()).expect("Failed to load config");
        assert_eq!(loaded.statistics.target, 10);
        assert_eq!(loaded.statistics.grid_mode, GridMode::TwoD);
        assert_eq!(loaded.statistics.rows_per_target, 300);
        assert_eq!(loaded.log, LogConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        temp_file
            .write_all(b"[statistics]\ntarget = 0\n")
            .expect("Failed to write config");
        assert!(matches!(
            Config::load(temp_file.path()),
            Err(StatsError::Config(_))
        ));
        assert!(Config::load("/nonexistent/tempstats.toml").is_err());
    }
}
