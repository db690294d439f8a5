// マイグレーション実行エンジン
//
// 単一アーティファクトの検証、実行、時間計測、状態の永続化を行います。
// ステップ失敗時は設定に応じて逆方向の操作でロールバックを試みます。

use crate::adapters::storage::StorageAdapter;
use crate::core::error::{MigrateError, PersistenceWarning, RollbackOutcome};
use crate::core::migration::{
    AppliedRecord, CallArgument, Environment, Method, MigrationArtifact, MigrationOutcome,
    Operation,
};
use crate::core::naming::{AFTER_EXECUTE_EVENT, BEFORE_EXECUTE_EVENT};
use crate::services::events::{EventBus, ExecutionEvent};
use std::time::Instant;
use tracing::{debug, error, warn};

/// マイグレーション実行エンジン
pub struct MigrationExecutor<'a> {
    environment: &'a Environment,
    storage: &'a dyn StorageAdapter,
    events: &'a EventBus,
    roll_back: bool,
}

impl<'a> MigrationExecutor<'a> {
    /// 新しい実行エンジンを作成
    pub fn new(
        environment: &'a Environment,
        storage: &'a dyn StorageAdapter,
        events: &'a EventBus,
        roll_back: bool,
    ) -> Self {
        Self {
            environment,
            storage,
            events,
            roll_back,
        }
    }

    /// 実行件数を決定
    ///
    /// 未指定なら全件。指定値は1以上かつ`available`以下でなければなりません。
    pub fn resolve_count(count: Option<usize>, available: usize) -> Result<usize, MigrateError> {
        match count {
            None => Ok(available),
            Some(0) => Err(MigrateError::InvalidCount {
                requested: "0".to_string(),
                reason: "must be a positive integer".to_string(),
            }),
            Some(n) if n > available => Err(MigrateError::InvalidCount {
                requested: n.to_string(),
                reason: format!("only {} available", available),
            }),
            Some(n) => Ok(n),
        }
    }

    /// 単一アーティファクトを実行
    ///
    /// # Returns
    ///
    /// 実行結果（永続化に失敗した場合は警告付き）
    pub async fn execute(
        &self,
        artifact: &MigrationArtifact,
        method: Method,
    ) -> Result<MigrationOutcome, MigrateError> {
        artifact
            .body
            .validate()
            .map_err(|reason| MigrateError::InvalidMigration {
                path: artifact.display_path(),
                reason,
            })?;

        let args = self.storage.call_arguments().await?;

        self.events
            .emit(
                BEFORE_EXECUTE_EVENT,
                &ExecutionEvent {
                    method,
                    artifact,
                    duration_ms: None,
                },
            )
            .await;

        let started = Instant::now();
        match artifact.body.operation(method) {
            Some(operation) => {
                if let Err(cause) = self.run_steps(operation, &args).await {
                    let rollback = self.rollback(artifact, method, &args).await;
                    return Err(MigrateError::Execution {
                        path: artifact.display_path(),
                        method,
                        cause: format!("{:#}", cause),
                        rollback,
                    });
                }
            }
            None => warn!(
                method = %method,
                path = %artifact.display_path(),
                "No operation defined for this method, only the applied state is updated"
            ),
        }
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.events
            .emit(
                AFTER_EXECUTE_EVENT,
                &ExecutionEvent {
                    method,
                    artifact,
                    duration_ms: Some(duration_ms),
                },
            )
            .await;

        let warning = self.persist(artifact, method, duration_ms).await;
        Ok(MigrationOutcome::new(artifact, duration_ms, warning))
    }

    /// ステップを記載順に実行し、最初の失敗で止める
    async fn run_steps(&self, operation: &Operation, args: &[CallArgument]) -> anyhow::Result<()> {
        for (index, step) in operation.steps().iter().enumerate() {
            debug!(index, "Running step");
            step.run(self.environment, args)
                .await
                .inspect_err(|e| debug!(index, error = %e, "Step failed"))?;
        }
        Ok(())
    }

    /// 同じアーティファクトの逆方向の操作を実行
    ///
    /// 逆操作は通常の実行と同じく記載順に全ステップを実行します。
    /// 適用状態の変更とイベント通知は行いません。
    async fn rollback(
        &self,
        artifact: &MigrationArtifact,
        method: Method,
        args: &[CallArgument],
    ) -> RollbackOutcome {
        if !self.roll_back {
            return RollbackOutcome::Disabled;
        }

        let opposite = method.opposite();
        let Some(operation) = artifact.body.operation(opposite) else {
            warn!(path = %artifact.display_path(), "No {} operation to roll back with", opposite);
            return RollbackOutcome::Unavailable;
        };

        warn!(
            method = %opposite,
            path = %artifact.display_path(),
            "Rolling back failed migration"
        );

        match self.run_steps(operation, args).await {
            Ok(()) => RollbackOutcome::Succeeded,
            Err(e) => {
                error!(path = %artifact.display_path(), error = %e, "Rollback failed");
                RollbackOutcome::Failed {
                    cause: format!("{:#}", e),
                }
            }
        }
    }

    /// 適用状態を保存し、失敗時は警告を返す
    async fn persist(
        &self,
        artifact: &MigrationArtifact,
        method: Method,
        duration_ms: f64,
    ) -> Option<PersistenceWarning> {
        let result = match method {
            Method::Up => {
                self.storage
                    .record_applied(&AppliedRecord::for_artifact(artifact, duration_ms))
                    .await
            }
            Method::Down => {
                self.storage
                    .remove_applied(&artifact.module, &artifact.relative_name, artifact.category)
                    .await
            }
        };

        result.err().map(|e| {
            let warning = PersistenceWarning::new(artifact.display_path(), method, e.to_string());
            error!("{}", warning.format());
            warning
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_count() {
        assert_eq!(MigrationExecutor::resolve_count(None, 4).unwrap(), 4);
        assert_eq!(MigrationExecutor::resolve_count(Some(3), 4).unwrap(), 3);
        assert_eq!(MigrationExecutor::resolve_count(Some(4), 4).unwrap(), 4);
        assert!(MigrationExecutor::resolve_count(Some(5), 4)
            .unwrap_err()
            .is_invalid_count());
        assert!(MigrationExecutor::resolve_count(Some(0), 4)
            .unwrap_err()
            .is_invalid_count());
    }
}
