//! 最近更改源
//!
//! 通过 MediaWiki API（`list=recentchanges`）获取最近若干小时内在主命名空间
//! 被编辑或新建的页面，作为增量运行的页面列表。

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::core::MirrorError;
use crate::utils::{PageId, Url};

/// 单次请求的条目上限
const RC_LIMIT: &str = "500";

#[derive(Debug, Deserialize, Default)]
struct QueryResponse {
    #[serde(default)]
    query: QueryPayload,
    #[serde(default, rename = "continue")]
    continuation: Option<ContinuationPayload>,
}

#[derive(Debug, Deserialize, Default)]
struct QueryPayload {
    #[serde(default)]
    recentchanges: Vec<RecentChangeItem>,
}

#[derive(Debug, Deserialize, Default)]
struct ContinuationPayload {
    rccontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecentChangeItem {
    title: String,
}

/// 最近更改源客户端
#[derive(Debug, Clone)]
pub struct RecentChangesFeed {
    client: Client,
    api_url: Url,
}

impl RecentChangesFeed {
    pub fn new(api_url: Url, user_agent: &str, timeout: Duration) -> Result<Self, MirrorError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| MirrorError::Config(format!("无法创建 HTTP 客户端: {}", e)))?;
        Ok(Self { client, api_url })
    }

    /// 获取 `hours` 小时内更改过的页面，按首次出现顺序去重
    pub async fn changed_pages(&self, hours: u32) -> Result<Vec<PageId>, MirrorError> {
        let since = cutoff(Utc::now(), hours);
        tracing::info!("查询 {} 之后的最近更改", since);

        let mut titles = Vec::new();
        let mut continue_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("action", "query".to_string()),
                ("format", "json".to_string()),
                ("formatversion", "2".to_string()),
                ("list", "recentchanges".to_string()),
                ("rcstart", since.clone()),
                ("rcdir", "newer".to_string()),
                ("rcnamespace", "0".to_string()),
                ("rcprop", "title".to_string()),
                ("rclimit", RC_LIMIT.to_string()),
                ("rctype", "edit|new".to_string()),
            ];
            if let Some(token) = &continue_token {
                params.push(("rccontinue", token.clone()));
            }

            let parsed: QueryResponse = self
                .client
                .get(self.api_url.clone())
                .query(&params)
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|e| MirrorError::SourceLoad {
                    source_name: self.api_url.to_string(),
                    reason: e.to_string(),
                })?
                .json()
                .await
                .map_err(|e| MirrorError::SourceLoad {
                    source_name: self.api_url.to_string(),
                    reason: format!("无法解析 recentchanges 响应: {}", e),
                })?;

            titles.extend(parsed.query.recentchanges.into_iter().map(|item| item.title));

            continue_token = parsed.continuation.and_then(|cont| cont.rccontinue);
            if continue_token.is_none() {
                break;
            }
        }

        Ok(dedup_titles(titles))
    }
}

/// 查询起点：`now` 之前 `hours` 小时，ISO 8601 格式
pub fn cutoff(now: DateTime<Utc>, hours: u32) -> String {
    (now - chrono::Duration::hours(i64::from(hours))).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn dedup_titles(titles: Vec<String>) -> Vec<PageId> {
    let mut seen = HashSet::new();
    titles
        .iter()
        .filter_map(|title| PageId::new(title))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
