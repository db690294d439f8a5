// マイグレーションバージョン
//
// マイグレーション名（`MAJOR.MINOR.PATCH-label`）に埋め込まれたバージョンの
// 解析と比較を行う純粋関数群。並び替えロジックとは独立して検証できるよう分離しています。

use crate::core::error::VersionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// マイグレーション名のパターン
///
/// 先頭の3要素バージョンとハイフン、空でないラベルを要求します。
pub static MIGRATION_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)-(.+)$").expect("migration name regex is valid")
});

/// 3要素のセマンティックバージョン
///
/// プレリリースやビルドメタデータは扱いません。
/// フィールド順の導出`Ord`がmajor → minor → patchの優先順位と一致します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// 新しいバージョンを作成
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// マイグレーション名からバージョンを解析
    ///
    /// # Arguments
    ///
    /// * `relative_name` - マイグレーション名（例: `0.1.0-create-users.yaml`）
    ///
    /// # Returns
    ///
    /// 解析したバージョン、パターンに一致しない場合は`VersionError::InvalidFormat`
    pub fn parse(relative_name: &str) -> Result<Self, VersionError> {
        let captures = MIGRATION_NAME_REGEX
            .captures(relative_name)
            .ok_or_else(|| VersionError::InvalidFormat {
                name: relative_name.to_string(),
            })?;

        let component = |index: usize| -> Result<u64, VersionError> {
            captures[index]
                .parse::<u64>()
                .map_err(|_| VersionError::InvalidFormat {
                    name: relative_name.to_string(),
                })
        };

        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// 名前がマイグレーションの命名規則に一致するかどうか
pub fn is_migration_name(relative_name: &str) -> bool {
    Version::parse(relative_name).is_ok()
}
