//! 应用配置模块（U 盘根目录下的 beam_config.json）

use crate::error::{Error, Result};
use crate::logging::LogConfig;
use crate::transport::UPLOAD_TIMEOUT_SECS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// 上传与扫描配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamConfig {
    /// 基地主机地址
    #[serde(default)]
    pub base_ip: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// 完整上传地址，设置后忽略 base_ip/port/upload_path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 导入时的扩展名过滤（空表示不限制）
    #[serde(default)]
    pub extensions: Vec<String>,
    /// 额外排除的目录名
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_port() -> u16 {
    8080
}

fn default_upload_path() -> String {
    "/api/upload".to_string()
}

fn default_timeout_secs() -> u64 {
    UPLOAD_TIMEOUT_SECS
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            base_ip: String::new(),
            access_key: String::new(),
            port: default_port(),
            upload_path: default_upload_path(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            extensions: Vec::new(),
            exclude: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

impl BeamConfig {
    /// 从配置文件加载；文件不存在或无法解析时使用默认配置
    pub fn load(config_file: &Path) -> Self {
        Self::try_load(config_file).unwrap_or_else(|e| {
            warn!("{}，使用默认配置", e);
            Self::default()
        })
    }

    /// 从配置文件加载；文件不存在时为默认配置，无法解析时返回错误
    pub fn try_load(config_file: &Path) -> Result<Self> {
        let content = match fs::read_to_string(config_file) {
            Ok(content) => content,
            Err(_) => {
                debug!("配置文件不存在，使用默认配置: {}", config_file.display());
                return Ok(Self::default());
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("配置文件解析失败: {} - {}", config_file.display(), e))
        })
    }

    /// 保存配置，保留文件中其他未知字段
    pub fn save(&self, config_file: &Path) -> Result<()> {
        let mut config: serde_json::Value = fs::read_to_string(config_file)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .filter(serde_json::Value::is_object)
            .unwrap_or_else(|| serde_json::json!({}));

        if let (Some(target), serde_json::Value::Object(fields)) =
            (config.as_object_mut(), serde_json::to_value(self)?)
        {
            if self.endpoint.is_none() {
                target.remove("endpoint");
            }
            target.extend(fields);
        }

        if let Some(parent) = config_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(config_file, serde_json::to_string_pretty(&config)?)?;
        Ok(())
    }

    /// 上传地址
    pub fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("http://{}:{}{}", self.base_ip, self.port, self.upload_path),
        }
    }

    /// 检查上传所需字段
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_none() && self.base_ip.trim().is_empty() {
            return Err(Error::Config("未设置 base_ip".to_string()));
        }
        if self.access_key.is_empty() {
            return Err(Error::Config("未设置 access_key".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs 必须大于 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_base_ip() {
        let config: BeamConfig =
            serde_json::from_str(r#"{"base_ip": "192.168.1.20", "access_key": "k"}"#).unwrap();
        assert_eq!(config.endpoint(), "http://192.168.1.20:8080/api/upload");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_fields() {
        let config = BeamConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = BeamConfig {
            endpoint: Some("http://base/upload".to_string()),
            ..BeamConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("access_key")));
    }

    #[test]
    fn test_save_merges_existing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("beam_config.json");
        fs::write(&file, r#"{"base_ip": "10.0.0.1", "notes": "keep me"}"#).unwrap();

        let mut config = BeamConfig::load(&file);
        assert_eq!(config.base_ip, "10.0.0.1");
        config.access_key = "secret".to_string();
        config.save(&file).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(raw["notes"], "keep me");
        assert_eq!(raw["access_key"], "secret");
        assert_eq!(BeamConfig::load(&file), config);
    }

    #[test]
    fn test_load_invalid_json_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("beam_config.json");
        fs::write(&file, "{ not json").unwrap();
        assert_eq!(BeamConfig::load(&file), BeamConfig::default());
        assert!(matches!(
            BeamConfig::try_load(&file),
            Err(Error::Config(msg)) if msg.contains("beam_config.json")
        ));
    }

    #[test]
    fn test_try_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = BeamConfig::try_load(&dir.path().join("beam_config.json")).unwrap();
        assert_eq!(config, BeamConfig::default());
    }
}
