//! erp-admin: ERP管理APIのコマンドラインクライアント
//!
//! ドメインストア・HTTPアダプタ本体は `erp-admin-common` にあり、
//! ここではreqwestトランスポート・設定・CLIを提供する。

pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
