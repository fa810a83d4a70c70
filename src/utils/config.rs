use crate::core::error::{AppError, AppResult};
use crate::models::{AppConfig, LogLevel};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// 配置文件路径覆盖变量
pub const CONFIG_PATH_ENV: &str = "COSTWATCH_CONFIG";

const ADS_URL_ENV: &str = "COSTWATCH_ADS_URL";
const AVG_URL_ENV: &str = "COSTWATCH_AVG_URL";
const HOST_ENV: &str = "COSTWATCH_HOST";
const PORT_ENV: &str = "COSTWATCH_PORT";
const CACHE_TTL_ENV: &str = "COSTWATCH_CACHE_TTL_SECS";
const LOG_LEVEL_ENV: &str = "COSTWATCH_LOG_LEVEL";

/// costwatch 配置目录 (~/.costwatch)
pub fn config_dir() -> AppResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| AppError::config("无法获取用户主目录"))?;
    Ok(home_dir.join(".costwatch"))
}

/// 配置文件路径：优先 `COSTWATCH_CONFIG`，否则 `~/.costwatch/config.toml`
pub fn config_path() -> AppResult<PathBuf> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(config_dir()?.join("config.toml")),
    }
}

/// 加载配置：读取 TOML 文件（可不存在）→ 应用环境变量覆盖 → 校验
pub fn load_config() -> AppResult<AppConfig> {
    let path = config_path()?;
    let mut config = read_config_file(&path)?.unwrap_or_default();
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// 读取配置文件（若文件不存在返回 Ok(None)）
pub fn read_config_file(path: &Path) -> AppResult<Option<AppConfig>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "配置文件不存在，使用默认值");
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| AppError::config(format!("解析 {} 失败: {e}", path.display())))?;

    Ok(Some(config))
}

/// 用环境变量覆盖配置项
pub fn apply_env_overrides(config: &mut AppConfig) -> AppResult<()> {
    if let Some(url) = env_value(ADS_URL_ENV) {
        config.upstream.ads_url = url;
    }
    if let Some(url) = env_value(AVG_URL_ENV) {
        config.upstream.avg_url = url;
    }
    if let Some(host) = env_value(HOST_ENV) {
        config.server.host = host;
    }
    if let Some(port) = env_value(PORT_ENV) {
        config.server.port = port
            .parse()
            .map_err(|e| AppError::config(format!("{PORT_ENV} 无效: {e}")))?;
    }
    if let Some(ttl) = env_value(CACHE_TTL_ENV) {
        config.cache.ttl_secs = ttl
            .parse()
            .map_err(|e| AppError::config(format!("{CACHE_TTL_ENV} 无效: {e}")))?;
    }
    if let Some(level) = env_value(LOG_LEVEL_ENV) {
        config.log.level = LogLevel::parse(&level)
            .ok_or_else(|| AppError::config(format!("{LOG_LEVEL_ENV} 无效: {level}")))?;
    }
    Ok(())
}

/// 校验配置
pub fn validate_config(config: &AppConfig) -> AppResult<()> {
    validate_upstream_url("upstream.ads_url", &config.upstream.ads_url)?;
    validate_upstream_url("upstream.avg_url", &config.upstream.avg_url)?;

    if config.cache.ttl_secs == 0 {
        return Err(AppError::config("cache.ttl_secs 必须大于 0"));
    }

    if let Some(proxy) = config.upstream.proxy.as_deref() {
        if !proxy.trim().is_empty() {
            Url::parse(proxy)
                .map_err(|e| AppError::config(format!("upstream.proxy 无效: {e}")))?;
        }
    }

    Ok(())
}

fn validate_upstream_url(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::config(format!("{field} 未设置")));
    }

    let url = Url::parse(value).map_err(|e| AppError::config(format!("{field} 无效: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::config(format!(
            "{field} 协议不受支持: {other}"
        ))),
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
