//! 抓取调度
//!
//! 单一控制循环维护 FIFO 队列与已访问集合，最多同时运行 `concurrency` 个页面任务。
//! 页面任务持有 `Rc` DOM，不能跨线程移动，因此任务在同一个 future 集合里轮询，
//! 不经过 `tokio::spawn`。修订记录与重定向地图只在任务结束后由循环本身更新。

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;

use crate::core::{MirrorError, PageOutcome, PagePipeline, PageResult};
use crate::storage::{RedirectMap, RevisionId, RevisionMap};
use crate::utils::PageId;

/// 待处理页面队列与已访问集合
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<PageId>,
    queued: HashSet<PageId>,
    visited: HashSet<PageId>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入队列；已访问或已在队列中时返回 `false`
    pub fn push(&mut self, page: PageId) -> bool {
        if self.visited.contains(&page) || self.queued.contains(&page) {
            return false;
        }
        self.queued.insert(page.clone());
        self.queue.push_back(page);
        true
    }

    /// 取出下一个页面并立即标记为已访问
    pub fn pop(&mut self) -> Option<PageId> {
        let page = self.queue.pop_front()?;
        self.queued.remove(&page);
        self.visited.insert(page.clone());
        Some(page)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn visited(&self) -> usize {
        self.visited.len()
    }

    pub fn was_visited(&self, page: &PageId) -> bool {
        self.visited.contains(page)
    }
}

/// 强制处理范围
#[derive(Debug, Clone, Default)]
pub enum ForcePolicy {
    /// 全部按修订号判断
    #[default]
    None,
    /// 只强制列表中的页面
    Pages(HashSet<PageId>),
    /// 刷新模式，全部强制
    All,
}

impl ForcePolicy {
    pub fn is_forced(&self, page: &PageId) -> bool {
        match self {
            Self::None => false,
            Self::Pages(pages) => pages.contains(page),
            Self::All => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub concurrency: usize,
    /// 是否把发现的链接加入队列
    pub follow_links: bool,
    pub force: ForcePolicy,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            follow_links: true,
            force: ForcePolicy::None,
        }
    }
}

/// 各结局的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub transformed: usize,
    pub unchanged: usize,
    pub redirected: usize,
    pub nonexistent: usize,
    pub failed: usize,
}

impl CrawlStats {
    pub fn settled(&self) -> usize {
        self.transformed + self.unchanged + self.redirected + self.nonexistent + self.failed
    }
}

/// 一次运行的结果：最终状态与统计
#[derive(Debug)]
pub struct CrawlReport {
    pub revisions: RevisionMap,
    pub redirects: RedirectMap,
    pub stats: CrawlStats,
    /// 失败的页面，按结束顺序
    pub failures: Vec<PageId>,
}

type PageTask<'a> = Pin<Box<dyn Future<Output = (PageId, Result<PageResult, MirrorError>)> + 'a>>;

pub struct Scheduler<'a> {
    pipeline: &'a PagePipeline,
    options: SchedulerOptions,
}

impl<'a> Scheduler<'a> {
    pub fn new(pipeline: &'a PagePipeline, options: SchedulerOptions) -> Self {
        Self { pipeline, options }
    }

    /// 从起始页面开始运行，直到队列为空且没有任务在运行
    pub async fn run(
        &self,
        start_pages: Vec<PageId>,
        mut revisions: RevisionMap,
        mut redirects: RedirectMap,
    ) -> CrawlReport {
        let limit = self.options.concurrency.max(1);
        let mut frontier = Frontier::new();
        for page in start_pages {
            frontier.push(page);
        }

        let mut in_flight: FuturesUnordered<PageTask<'a>> = FuturesUnordered::new();
        let mut stats = CrawlStats::default();
        let mut failures = Vec::new();

        tracing::info!("开始抓取：{} 个起始页面，并发上限 {}", frontier.pending(), limit);

        loop {
            while in_flight.len() < limit {
                let Some(page) = frontier.pop() else {
                    break;
                };
                let forced = self.options.force.is_forced(&page);
                let stored = revisions.get(&page).cloned();
                in_flight.push(self.dispatch(page, forced, stored));
            }

            let Some((page, result)) = in_flight.next().await else {
                break;
            };

            match result {
                Ok(result) => {
                    match &result.outcome {
                        PageOutcome::Transformed { revision } => {
                            stats.transformed += 1;
                            if let Some(revision) = revision {
                                revisions.insert(page.clone(), revision.clone());
                            }
                        }
                        PageOutcome::Unchanged => stats.unchanged += 1,
                        PageOutcome::Redirected { target } => {
                            stats.redirected += 1;
                            redirects.insert(page.clone(), target.clone());
                        }
                        PageOutcome::Nonexistent => stats.nonexistent += 1,
                    }

                    if self.options.follow_links {
                        let discovered = result
                            .links
                            .into_iter()
                            .filter(|link| frontier.push(link.clone()))
                            .count();
                        tracing::debug!("[{}] 新发现 {} 个页面", page, discovered);
                    }
                }
                Err(error) => {
                    stats.failed += 1;
                    tracing::error!("[{}] 处理失败: {}", page, error);
                    failures.push(page);
                }
            }

            tracing::info!(
                "进度：已完成 {} / 已发现 {}（运行中 {}，排队 {}）",
                stats.settled(),
                frontier.visited() + frontier.pending(),
                in_flight.len(),
                frontier.pending()
            );
        }

        tracing::info!(
            "抓取结束：转换 {}，未变化 {}，重定向 {}，不存在 {}，失败 {}",
            stats.transformed,
            stats.unchanged,
            stats.redirected,
            stats.nonexistent,
            stats.failed
        );

        CrawlReport {
            revisions,
            redirects,
            stats,
            failures,
        }
    }

    /// 包装单个页面任务：panic 在任务边界被捕获
    fn dispatch(&self, page: PageId, forced: bool, stored: Option<RevisionId>) -> PageTask<'a> {
        let pipeline = self.pipeline;
        Box::pin(async move {
            let outcome = AssertUnwindSafe(pipeline.process_page(&page, forced, stored.as_ref()))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(MirrorError::TaskPanicked {
                        page: page.to_string(),
                    })
                });
            (page, outcome)
        })
    }
}
