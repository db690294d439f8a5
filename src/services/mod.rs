// Services Layer
// ドメインロジックを実行するサービス層

pub mod catalog;
pub mod config_loader;
pub mod discovery;
pub mod events;
pub mod migration_executor;
pub mod migration_service;
pub mod module_order;
pub mod pending_resolver;
pub mod steps;
