//! beacon-core
//!
//! Batched AI triage for bug and feedback reports.
//!
//! # モジュール構成
//! - **queue**: 汎用バッチキュー（`TaskQueue`, batch / debounce / cancel, result stream）
//! - **processor**: AI レポート処理（prompt 組み立て, Gemini 呼び出し, `{severity, summary}` の解析）
//! - **domain**: ドメインモデル（ids, severity, report, summary, prompt context）
//! - **ports**: 抽象化レイヤー（ReportStore, CommentStore, ProjectStore, PromptFormatter, GenerativeModel）
//! - **impls**: 実装（InMemoryStore, SegmentPromptFormatter, GeminiClient）
//! - **config**: feature flags, live flag cell, TOML config file
//! - **observability**: queue stats and tracing setup
//! - **error**: `BeaconError`

pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod processor;
pub mod queue;

pub use config::{BeaconConfig, FeatureConfig, FeatureConfigCell};
pub use domain::{ReportId, ReportSummary, Severity};
pub use error::BeaconError;
pub use processor::{AiReportProcessor, ProcessorDeps};
pub use queue::{QueueConfig, QueueEvent, TaskQueue, WaitError};
