// 実行イベント
//
// 各マイグレーションの実行前後に通知を発行するオブザーバーバス。
// ハンドラーは登録順に逐次awaitされます。

use crate::core::migration::{MigrationArtifact, Method};
use crate::core::naming::{AFTER_EXECUTE_EVENT, BEFORE_EXECUTE_EVENT};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 実行イベント
#[derive(Debug, Clone, Copy)]
pub struct ExecutionEvent<'a> {
    /// 実行メソッド
    pub method: Method,
    /// 対象のアーティファクト
    pub artifact: &'a MigrationArtifact,
    /// 実行時間（実行後イベントのみ）
    pub duration_ms: Option<f64>,
}

/// イベントハンドラー
#[async_trait]
pub trait MigrationObserver: Send + Sync {
    async fn notify(&self, event: &ExecutionEvent<'_>);
}

/// イベントバス
#[derive(Default, Clone)]
pub struct EventBus {
    handlers: HashMap<String, Vec<Arc<dyn MigrationObserver>>>,
}

impl EventBus {
    /// 空のバスを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// イベント名にハンドラーを登録
    pub fn on(&mut self, event: impl Into<String>, observer: Arc<dyn MigrationObserver>) {
        self.handlers.entry(event.into()).or_default().push(observer);
    }

    /// 実行前・実行後の両イベントにハンドラーを登録
    pub fn on_execute(&mut self, observer: Arc<dyn MigrationObserver>) {
        self.on(BEFORE_EXECUTE_EVENT, observer.clone());
        self.on(AFTER_EXECUTE_EVENT, observer);
    }

    /// イベントを発行（登録順に逐次実行）
    pub async fn emit(&self, event: &str, payload: &ExecutionEvent<'_>) {
        let Some(handlers) = self.handlers.get(event) else {
            return;
        };
        for handler in handlers {
            handler.notify(payload).await;
        }
    }

    /// 登録済みハンドラー数
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }
}

/// 実行イベントをtracingへ出力するオブザーバー
#[derive(Debug, Default)]
pub struct TracingObserver;

#[async_trait]
impl MigrationObserver for TracingObserver {
    async fn notify(&self, event: &ExecutionEvent<'_>) {
        match event.duration_ms {
            None => debug!(
                method = %event.method,
                path = %event.artifact.display_path(),
                "Executing migration"
            ),
            Some(duration) => debug!(
                method = %event.method,
                path = %event.artifact.display_path(),
                duration_ms = duration,
                "Migration executed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::migration::{Category, MigrationBody, ModuleRef};
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl MigrationObserver for Recorder {
        async fn notify(&self, event: &ExecutionEvent<'_>) {
            self.seen.lock().unwrap().push(format!(
                "{}:{}:{}",
                self.label, event.method, event.artifact.relative_name
            ));
        }
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.on(
            BEFORE_EXECUTE_EVENT,
            Arc::new(Recorder {
                label: "first",
                seen: seen.clone(),
            }),
        );
        bus.on(
            BEFORE_EXECUTE_EVENT,
            Arc::new(Recorder {
                label: "second",
                seen: seen.clone(),
            }),
        );

        let artifact = MigrationArtifact::new(
            ModuleRef::new("core"),
            Category::Schema,
            "0.1.0-a",
            "/core/0.1.0-a",
            MigrationBody::default(),
        )
        .unwrap();
        let event = ExecutionEvent {
            method: Method::Up,
            artifact: &artifact,
            duration_ms: None,
        };

        bus.emit(BEFORE_EXECUTE_EVENT, &event).await;
        bus.emit(AFTER_EXECUTE_EVENT, &event).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:up:0.1.0-a", "second:up:0.1.0-a"]
        );
        assert_eq!(bus.handler_count(AFTER_EXECUTE_EVENT), 0);
    }

    #[test]
    fn test_on_execute_registers_both_events() {
        let mut bus = EventBus::new();
        bus.on_execute(Arc::new(TracingObserver));
        assert_eq!(bus.handler_count(BEFORE_EXECUTE_EVENT), 1);
        assert_eq!(bus.handler_count(AFTER_EXECUTE_EVENT), 1);
    }
}
