// access-engine/src/config.rs
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub closure_cache_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv().ok(); // .env ファイルを読み込む (存在しなくてもエラーにしない)

        let database_url = env::var("DATABASE_URL")?;
        let closure_cache_enabled = env::var("CLOSURE_CACHE_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(Config {
            database_url,
            closure_cache_enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_flag_parsing() {
        // 環境変数に依存しない範囲でデフォルト挙動を確認
        let config = Config {
            database_url: "postgres://localhost/admin".to_string(),
            closure_cache_enabled: true,
        };
        assert!(config.closure_cache_enabled);
    }
}
