//! BananaEdit core library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the server binary.
//! - `provider`: Image-edit provider contract and the Gemini client.
//! - `session`: Edit-session state machine and the orchestration around it.
//! - `cache`: Durable response store and network-first offline fetch proxy.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `GeminiClient`,
//! `SessionState`, `CacheStore`, and `FetchProxy`.
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod session;

pub use cache::proxy::FetchProxy;
pub use cache::store::CacheStore;
pub use config::Config;
pub use provider::gemini::GeminiClient;
pub use session::state::SessionState;
