use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// API URLを上書きする環境変数
pub const API_URL_ENV: &str = "ERP_ADMIN_API_URL";
/// セッション用トークンの環境変数（設定ファイルより優先）
pub const TOKEN_ENV: &str = "ERP_ADMIN_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub token: Option<String>,
    pub default_page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            token: None,
            default_page_size: erp_admin_common::resource::DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("erp-admin").join("config.json"))
    }

    /// 有効なAPI URL（引数 → 環境変数 → 設定ファイルの順）
    pub fn api_base_url(&self, cli_override: Option<&str>) -> Result<String> {
        let env = std::env::var(API_URL_ENV).ok();
        let url = cli_override
            .map(str::to_string)
            .or(env)
            .or_else(|| self.api_base_url.clone())
            .filter(|url| !url.trim().is_empty())
            .ok_or(AppError::MissingApiUrl)?;
        validate_url(&url)?;
        Ok(url)
    }

    pub fn set_api_base_url(&mut self, url: String) -> Result<()> {
        validate_url(&url)?;
        self.api_base_url = Some(url);
        Ok(())
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token).filter(|t| !t.trim().is_empty());
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// 表示用にマスクしたトークン
    pub fn masked_token(&self) -> String {
        match self.token.as_deref() {
            Some(token) if token.chars().count() > 8 => {
                let tail: String = token.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
                format!("****{}", tail)
            }
            Some(_) => "****".to_string(),
            None => "未設定".to_string(),
        }
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).map_err(|e| AppError::Config(format!("API URLが不正です ({}): {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::Config(format!("未対応のスキームです: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_token() {
        let mut config = Config::default();
        assert_eq!(config.masked_token(), "未設定");
        config.set_token("short".to_string());
        assert_eq!(config.masked_token(), "****");
        config.set_token("eyJhbGciOiJIUzI1NiJ9.payload.sig4".to_string());
        assert_eq!(config.masked_token(), "****sig4");
    }

    #[test]
    fn test_set_blank_token_clears() {
        let mut config = Config::default();
        config.set_token("  ".to_string());
        assert!(config.token.is_none());
    }

    #[test]
    fn test_api_url_cli_override_wins() {
        let config = Config {
            api_base_url: Some("http://stored.local".to_string()),
            ..Default::default()
        };
        let url = config.api_base_url(Some("https://cli.local")).unwrap();
        assert_eq!(url, "https://cli.local");
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut config = Config::default();
        assert!(config.set_api_base_url("not a url".to_string()).is_err());
        assert!(config.set_api_base_url("ftp://files.local".to_string()).is_err());
        assert!(config.set_api_base_url("http://localhost:5000".to_string()).is_ok());
    }
}
