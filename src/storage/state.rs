//! 持久化状态文档
//!
//! 两个独立的扁平 JSON 对象：
//! - 修订记录 `{ "<页面>": "<修订号>" }`
//! - 重定向地图 `{ "<源页面>": "<目标页面>" }`
//!
//! 两者在首次运行时都可以不存在；文件损坏时按空状态处理，不中止运行。

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::MirrorError;
use crate::utils::PageId;

/// 修订标识符
///
/// 不透明字符串；旧状态文件中的数字值在加载时也被接受。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 数字形式（可比较先后）
    pub fn as_number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for RevisionId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for RevisionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => RevisionId(n.to_string()),
            Raw::Text(s) => RevisionId(s),
        })
    }
}

/// 键值状态文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMap<V> {
    entries: BTreeMap<PageId, V>,
}

/// 页面 -> 最近处理的修订号
pub type RevisionMap = StateMap<RevisionId>;

/// 源页面 -> 目标页面
pub type RedirectMap = StateMap<PageId>;

impl<V> Default for StateMap<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> StateMap<V>
where
    V: Serialize + DeserializeOwned + Clone + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取状态文件；不存在时返回空文档
    pub fn try_load(path: &Path) -> Result<Self, MirrorError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let corrupt = |reason: String| MirrorError::StateFileCorrupt {
            path: path.display().to_string(),
            reason,
        };

        let raw = fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let entries: BTreeMap<String, V> =
            serde_json::from_str(&raw).map_err(|e| corrupt(e.to_string()))?;

        // 旧文件中的键可能带空格，统一规范化
        let entries = entries
            .into_iter()
            .filter_map(|(key, value)| PageId::new(&key).map(|id| (id, value)))
            .collect();

        Ok(Self { entries })
    }

    /// 读取状态文件；损坏时记录错误并按空状态处理
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(map) => {
                if !map.is_empty() {
                    tracing::info!("已加载状态文件 {} ({} 条)", path.display(), map.len());
                }
                map
            }
            Err(error) => {
                tracing::error!("{}，将作为首次运行处理", error);
                Self::default()
            }
        }
    }

    /// 序列化为带缩进的 JSON，键按字典序排列
    pub fn to_json(&self) -> Result<String, MirrorError> {
        let mut json = serde_json::to_string_pretty(&self.entries)?;
        json.push('\n');
        Ok(json)
    }

    /// 写入状态文件；内容未变化时不写，返回是否写入
    pub fn save(&self, path: &Path) -> Result<bool, MirrorError> {
        let json = self.to_json()?;

        if let Ok(existing) = fs::read(path) {
            if existing == json.as_bytes() {
                tracing::debug!("状态文件 {} 未变化", path.display());
                return Ok(false);
            }
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, json)?;
        tracing::info!("已保存状态文件 {} ({} 条)", path.display(), self.len());
        Ok(true)
    }

    pub fn get(&self, key: &PageId) -> Option<&V> {
        self.entries.get(key)
    }

    /// 写入一条记录，返回旧值
    pub fn insert(&mut self, key: PageId, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn contains(&self, key: &PageId) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PageId, &V)> {
        self.entries.iter()
    }
}

impl<V> FromIterator<(PageId, V)> for StateMap<V> {
    fn from_iter<I: IntoIterator<Item = (PageId, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
