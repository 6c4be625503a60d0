//! Env-driven configuration for the service and library.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Defaults are provided for convenience during development.
use std::env;
use dotenv;

pub struct Config {
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub gemini_model: String,
    /// Origin the offline proxy treats as "same-origin" for caching.
    pub app_origin: String,
    pub cache_dir: String,
    /// Cache generation name; bumping it invalidates every prior generation.
    pub cache_version: String,
    pub api_host: String,
    pub api_port: String,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }
    pub fn new() -> Result<Self, env::VarError> {
        Ok(Config {
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_else(|_| String::new()),
            gemini_api_url: env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-image".to_string()),
            app_origin: env::var("APP_ORIGIN").unwrap_or_else(|_| "http://127.0.0.1:8190".to_string()),
            cache_dir: env::var("CACHE_DIR").unwrap_or_else(|_| "./cache".to_string()),
            cache_version: env::var("CACHE_VERSION").unwrap_or_else(|_| "banana-edit-v1".to_string()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: env::var("API_PORT").unwrap_or_else(|_| "8190".to_string()),
        })
    }
    pub fn print_env_vars() {
        println!("GEMINI_API_KEY: {}", if env::var("GEMINI_API_KEY").is_ok() { "<set>" } else { "<unset>" });
        println!("GEMINI_API_URL: {}", env::var("GEMINI_API_URL").unwrap_or_else(|_| "<unset>".to_string()));
        println!("GEMINI_MODEL: {}", env::var("GEMINI_MODEL").unwrap_or_else(|_| "<unset>".to_string()));
        println!("APP_ORIGIN: {}", env::var("APP_ORIGIN").unwrap_or_else(|_| "<unset>".to_string()));
        println!("CACHE_DIR: {}", env::var("CACHE_DIR").unwrap_or_else(|_| "<unset>".to_string()));
        println!("CACHE_VERSION: {}", env::var("CACHE_VERSION").unwrap_or_else(|_| "<unset>".to_string()));
        println!("API_HOST: {}", env::var("API_HOST").unwrap_or_else(|_| "<unset>".to_string()));
        println!("API_PORT: {}", env::var("API_PORT").unwrap_or_else(|_| "<unset>".to_string()));
    }
}
