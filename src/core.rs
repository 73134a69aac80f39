//! 单页处理流程
//!
//! 抓取 → 元数据检查 → 不存在 / 重定向 / 未变化 / 完整转换。
//! 本模块只产出结果，不修改任何共享状态；修订记录与重定向地图由调度循环在
//! 任务结束后统一更新。

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::builders::PageWriter;
use crate::network::PageFetcher;
use crate::parsers::html::{parse_html, PageMetadata};
use crate::parsers::link_rewriter::collect_internal_links;
use crate::storage::RevisionId;
use crate::transform::ContentTransformer;
use crate::utils::PageId;

/// 根索引文档
pub const INDEX_FILE_NAME: &str = "index.html";

/// 运行与页面级别的错误
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("抓取页面 {page} 失败: {reason}")]
    FetchFailure { page: String, reason: String },

    #[error("抓取页面 {page} 超时（{seconds} 秒）")]
    FetchTimeout { page: String, seconds: u64 },

    #[error("页面 {page} 缺少元数据（RLCONF）")]
    MetadataMissing { page: String },

    #[error("状态文件 {path} 损坏: {reason}")]
    StateFileCorrupt { path: String, reason: String },

    #[error("加载 {source_name} 失败: {reason}")]
    SourceLoad { source_name: String, reason: String },

    #[error("配置错误: {0}")]
    Config(String),

    #[error("页面 {page} 的处理任务发生 panic")]
    TaskPanicked { page: String },

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl MirrorError {
    /// 是否属于抓取失败（含超时）
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::FetchFailure { .. } | Self::FetchTimeout { .. })
    }
}

/// 变化检测结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDecision {
    Process,
    SkipUnchanged,
}

/// 变化检测
///
/// 强制处理时忽略比较；当前修订号缺失时记录警告并完整处理。
pub fn decide_change(
    page: &PageId,
    forced: bool,
    stored: Option<&RevisionId>,
    current: Option<&RevisionId>,
) -> ChangeDecision {
    if forced {
        return ChangeDecision::Process;
    }

    let Some(current) = current else {
        tracing::warn!("[{}] 无法确定当前修订号，完整处理", page);
        return ChangeDecision::Process;
    };

    match stored {
        Some(stored) if stored == current => ChangeDecision::SkipUnchanged,
        Some(stored) => {
            if let (Some(old), Some(new)) = (stored.as_number(), current.as_number()) {
                if new < old {
                    tracing::warn!("[{}] 修订号回退: {} -> {}", page, old, new);
                }
            }
            ChangeDecision::Process
        }
        None => ChangeDecision::Process,
    }
}

/// 重定向目标：规范标题与请求标题不同
pub fn redirect_target(requested: &PageId, metadata: &PageMetadata) -> Option<PageId> {
    let canonical = PageId::new(metadata.canonical_title.as_deref()?)?;
    (&canonical != requested).then_some(canonical)
}

/// 单页处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// 已转换并写出；`revision` 缺失时不记录修订
    Transformed { revision: Option<RevisionId> },
    /// 修订未变化，只返回链接
    Unchanged,
    /// 写出了重定向页面
    Redirected { target: PageId },
    /// 源站点上不存在
    Nonexistent,
}

#[derive(Debug, Clone)]
pub struct PageResult {
    pub page: PageId,
    pub outcome: PageOutcome,
    /// 发现的内部链接（重定向时包含目标页面本身）
    pub links: Vec<PageId>,
}

/// 单页处理流程
pub struct PagePipeline {
    fetcher: Arc<dyn PageFetcher>,
    writer: Arc<dyn PageWriter>,
    transformer: Arc<ContentTransformer>,
    fetch_timeout: Duration,
}

impl PagePipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        writer: Arc<dyn PageWriter>,
        transformer: Arc<ContentTransformer>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            writer,
            transformer,
            fetch_timeout,
        }
    }

    pub fn transformer(&self) -> &ContentTransformer {
        &self.transformer
    }

    /// 处理一个页面
    ///
    /// `stored` 是调度循环在派发前读出的已记录修订号。
    pub async fn process_page(
        &self,
        page: &PageId,
        forced: bool,
        stored: Option<&RevisionId>,
    ) -> Result<PageResult, MirrorError> {
        let fetched = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(page))
            .await
            .map_err(|_| MirrorError::FetchTimeout {
                page: page.to_string(),
                seconds: self.fetch_timeout.as_secs(),
            })??;

        let metadata = fetched.metadata.ok_or_else(|| MirrorError::MetadataMissing {
            page: page.to_string(),
        })?;

        if !metadata.exists() {
            tracing::info!("[{}] 页面不存在，跳过", page);
            return Ok(PageResult {
                page: page.clone(),
                outcome: PageOutcome::Nonexistent,
                links: Vec::new(),
            });
        }

        let base_url = self.transformer.base_url();
        let document = parse_html(&fetched.markup);
        let mut links = collect_internal_links(&document.document, base_url);

        if let Some(target) = redirect_target(page, &metadata) {
            tracing::info!(
                "[{}] 重定向到 {}{}",
                page,
                target,
                metadata
                    .redirected_from
                    .as_deref()
                    .map(|from| format!("（来自 {}）", from))
                    .unwrap_or_default()
            );
            let stub = self.transformer.builder().redirect_stub(&target);
            self.writer.write(&page.output_file_name(), &stub).await?;

            if !links.contains(&target) {
                links.insert(0, target.clone());
            }
            return Ok(PageResult {
                page: page.clone(),
                outcome: PageOutcome::Redirected { target },
                links,
            });
        }

        let current = metadata.revision.as_ref();
        if decide_change(page, forced, stored, current) == ChangeDecision::SkipUnchanged {
            tracing::info!(
                "[{}] 修订号未变化（{}），跳过转换",
                page,
                stored.map(RevisionId::as_str).unwrap_or("-")
            );
            return Ok(PageResult {
                page: page.clone(),
                outcome: PageOutcome::Unchanged,
                links,
            });
        }

        let transformed = self.transformer.transform(&document, page).await;
        let written = self
            .writer
            .write(&page.output_file_name(), &transformed.html)
            .await?;
        if page == self.transformer.start_page() {
            self.writer.write(INDEX_FILE_NAME, &transformed.html).await?;
        }

        tracing::info!(
            "[{}] 转换完成: {}（{} 个片段{}）",
            page,
            transformed.title,
            transformed.fragments,
            if written { "" } else { "，内容未变化" }
        );

        Ok(PageResult {
            page: page.clone(),
            outcome: PageOutcome::Transformed {
                revision: metadata.revision.clone(),
            },
            links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(name: &str) -> PageId {
        PageId::new(name).unwrap()
    }

    #[test]
    fn forced_pages_are_always_processed() {
        let rev = RevisionId::from(10);
        assert_eq!(
            decide_change(&page("A"), true, Some(&rev), Some(&rev)),
            ChangeDecision::Process
        );
    }

    #[test]
    fn equal_revisions_are_skipped() {
        let rev = RevisionId::from(10);
        assert_eq!(
            decide_change(&page("A"), false, Some(&rev), Some(&RevisionId::new("10"))),
            ChangeDecision::SkipUnchanged
        );
    }

    #[test]
    fn missing_or_different_revisions_are_processed() {
        let stored = RevisionId::from(10);
        let newer = RevisionId::from(11);
        let older = RevisionId::from(9);
        let a = page("A");

        assert_eq!(decide_change(&a, false, None, Some(&newer)), ChangeDecision::Process);
        assert_eq!(decide_change(&a, false, Some(&stored), Some(&newer)), ChangeDecision::Process);
        assert_eq!(decide_change(&a, false, Some(&stored), Some(&older)), ChangeDecision::Process);
        assert_eq!(decide_change(&a, false, Some(&stored), None), ChangeDecision::Process);
    }

    #[test]
    fn redirect_detection_compares_normalized_titles() {
        let metadata = PageMetadata {
            article_id: Some(5),
            revision: Some(RevisionId::from(1)),
            canonical_title: Some("New Name".to_string()),
            redirected_from: Some("Old_Name".to_string()),
        };
        assert_eq!(redirect_target(&page("Old_Name"), &metadata), Some(page("New_Name")));
        assert_eq!(redirect_target(&page("New_Name"), &metadata), None);

        let untitled = PageMetadata {
            canonical_title: None,
            ..metadata
        };
        assert_eq!(redirect_target(&page("Old_Name"), &untitled), None);
    }
}
