use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wikimirror::builders::{FsPageWriter, HtmlBuilder};
use wikimirror::config::{ConfigManager, MirrorConfig};
use wikimirror::env::{self, EnvVar};
use wikimirror::network::{load_optional_mapping, load_page_list, HttpFetcher, RecentChangesFeed};
use wikimirror::parsers::html::ResourceMap;
use wikimirror::translation::{
    DeeplxTranslator, Dictionary, TranslationError, TranslationProcessor,
};
use wikimirror::{
    ContentTransformer, ForcePolicy, MirrorError, PageId, PagePipeline, RedirectMap, RevisionMap,
    Scheduler, SchedulerOptions,
};

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";

/// 把 MediaWiki 站点增量镜像为本地化的静态副本
#[derive(Parser, Debug)]
#[command(name = "wikimirror", version, about, long_about = None)]
struct Cli {
    /// 配置文件路径（默认按搜索路径查找）
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// 同时处理的页面数
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// 输出目录
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    output: Option<PathBuf>,

    /// 输出更详细的日志（-vv 为 trace）
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// 只输出错误
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 从起始页面开始沿链接抓取整个站点
    Crawl {
        /// 起始页面（默认取配置中的 start_page）
        #[arg(long)]
        start: Option<String>,

        /// 忽略修订记录，强制重新处理所有页面
        #[arg(long)]
        refresh: bool,
    },

    /// 只处理最近更改过的页面
    Changes {
        /// 换行分隔的页面列表文件
        #[arg(long, conflicts_with = "recent_hours", required_unless_present = "recent_hours")]
        list: Option<PathBuf>,

        /// 从最近更改源读取最近 N 小时内编辑过的页面
        #[arg(long)]
        recent_hours: Option<u32>,

        /// 同时沿发现的链接继续抓取
        #[arg(long)]
        follow: bool,
    },

    /// 强制处理指定页面
    Pages {
        /// 页面名称
        #[arg(required_unless_present = "list")]
        pages: Vec<String>,

        /// 追加读取的页面列表文件
        #[arg(long)]
        list: Option<PathBuf>,

        /// 同时沿发现的链接继续抓取
        #[arg(long)]
        follow: bool,
    },

    /// 生成示例配置文件
    InitConfig {
        path: PathBuf,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            print_error_message(&error.to_string());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let flag_level = match (quiet, verbose) {
        (true, _) => Some("error".to_string()),
        (false, 0) => None,
        (false, 1) => Some("debug".to_string()),
        (false, _) => Some("trace".to_string()),
    };

    let filter = match flag_level.or_else(env::core::LogLevel::get_override) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!env::core::NoColor::get().unwrap_or(false))
        .with_writer(std::io::stderr)
        .init();
}

fn print_error_message(msg: &str) {
    if env::core::NoColor::get().unwrap_or(false) {
        eprintln!("{}", msg);
    } else {
        eprintln!("{}{}{}", ANSI_COLOR_RED, msg, ANSI_COLOR_RESET);
    }
}

async fn run(cli: Cli) -> Result<(), MirrorError> {
    if let Commands::InitConfig { path, force } = &cli.command {
        return init_config(path, *force);
    }

    let mut config = ConfigManager::load(cli.config.as_deref())?.into_config();
    if let Some(concurrency) = cli.concurrency {
        config.crawl.concurrency = concurrency;
    }
    if let Some(output) = &cli.output {
        config.paths.output_dir = output.to_string_lossy().into_owned();
    }
    config.validate()?;

    let (start_pages, options) = plan_run(&cli.command, &config).await?;
    if start_pages.is_empty() {
        tracing::info!("没有需要处理的页面");
        return Ok(());
    }

    let (pipeline, processor) = build_pipeline(&config).await?;

    let revision_path = config.revision_path();
    let redirect_path = config.redirect_path();
    let revisions = RevisionMap::load(&revision_path);
    let redirects = RedirectMap::load(&redirect_path);
    tracing::info!(
        "已加载状态：修订记录 {} 条，重定向 {} 条",
        revisions.len(),
        redirects.len()
    );

    let report = Scheduler::new(&pipeline, options)
        .run(start_pages, revisions, redirects)
        .await;

    if report.revisions.save(&revision_path)? {
        tracing::info!("已保存修订记录: {}", revision_path.display());
    }
    if report.redirects.save(&redirect_path)? {
        tracing::info!("已保存重定向地图: {}", redirect_path.display());
    }

    let stats = processor.stats();
    tracing::info!(
        "翻译统计：请求 {}，重试 {}，备用 {}，直通 {}，失败 {}，分割 {}",
        stats.requests,
        stats.retries,
        stats.fallbacks,
        stats.pass_throughs,
        stats.failures,
        stats.splits
    );
    if !report.failures.is_empty() {
        tracing::warn!("{} 个页面处理失败", report.failures.len());
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<(), MirrorError> {
    if path.exists() && !force {
        return Err(MirrorError::Config(format!(
            "{} 已存在，使用 --force 覆盖",
            path.display()
        )));
    }
    ConfigManager::generate_example_config(path)?;
    println!("已生成示例配置: {}", path.display());
    Ok(())
}

/// 根据运行模式决定初始队列与调度选项
async fn plan_run(
    command: &Commands,
    config: &MirrorConfig,
) -> Result<(Vec<PageId>, SchedulerOptions), MirrorError> {
    let configured_force: HashSet<PageId> = config.force_pages().into_iter().collect();
    let concurrency = config.crawl.concurrency;

    match command {
        Commands::Crawl { start, refresh } => {
            let start_page = match start {
                Some(name) => PageId::new(name)
                    .ok_or_else(|| MirrorError::Config(format!("无效的起始页面: '{}'", name)))?,
                None => config.start_page()?,
            };
            let force = if *refresh {
                ForcePolicy::All
            } else {
                ForcePolicy::Pages(configured_force)
            };
            Ok((
                vec![start_page],
                SchedulerOptions {
                    concurrency,
                    follow_links: true,
                    force,
                },
            ))
        }
        Commands::Changes {
            list,
            recent_hours,
            follow,
        } => {
            let pages = match (list, recent_hours) {
                (Some(path), _) => load_page_list(path)?,
                (None, Some(hours)) => {
                    let feed = RecentChangesFeed::new(
                        config.api_url()?,
                        &config.site.user_agent,
                        config.fetch_timeout(),
                    )?;
                    feed.changed_pages(*hours).await?
                }
                (None, None) => {
                    return Err(MirrorError::Config(
                        "需要 --list 或 --recent-hours".to_string(),
                    ))
                }
            };
            tracing::info!("待处理的更改页面: {} 个", pages.len());
            Ok((
                pages,
                SchedulerOptions {
                    concurrency,
                    follow_links: *follow,
                    force: ForcePolicy::Pages(configured_force),
                },
            ))
        }
        Commands::Pages {
            pages,
            list,
            follow,
        } => {
            let mut selected: Vec<PageId> =
                pages.iter().filter_map(|name| PageId::new(name)).collect();
            if let Some(path) = list {
                selected.extend(load_page_list(path)?);
            }

            let mut seen = HashSet::new();
            selected.retain(|page| seen.insert(page.clone()));
            if selected.is_empty() {
                return Err(MirrorError::SourceLoad {
                    source_name: "pages".to_string(),
                    reason: "页面列表为空".to_string(),
                });
            }

            let mut forced = configured_force;
            forced.extend(selected.iter().cloned());
            Ok((
                selected,
                SchedulerOptions {
                    concurrency,
                    follow_links: *follow,
                    force: ForcePolicy::Pages(forced),
                },
            ))
        }
        Commands::InitConfig { .. } => Ok((Vec::new(), SchedulerOptions::default())),
    }
}

async fn build_pipeline(
    config: &MirrorConfig,
) -> Result<(PagePipeline, Arc<TranslationProcessor>), MirrorError> {
    let timeout = config.fetch_timeout();
    let base_url = config.base_url()?;

    let entries = load_optional_mapping(Some(config.paths.dictionary.as_str()), timeout).await;
    let dictionary = Dictionary::new(entries).map_err(|e| MirrorError::SourceLoad {
        source_name: config.paths.dictionary.clone(),
        reason: e.to_string(),
    })?;
    tracing::info!("术语词典: {} 条（含复数扩展）", dictionary.len());

    let replacements =
        load_optional_mapping(Some(config.paths.resource_map.as_str()), timeout).await;
    let resources = ResourceMap::new(replacements.into_iter().collect());
    tracing::info!("资源替换表: {} 条", resources.len());

    let processor_config = config.processor_config();
    let request_timeout = processor_config.request_timeout;
    let translator_error = |e: TranslationError| MirrorError::Config(e.to_string());

    let primary = DeeplxTranslator::new(&config.translation.api_url, request_timeout)
        .map_err(translator_error)?;
    let mut processor = TranslationProcessor::new(Arc::new(primary), processor_config);
    if let Some(url) = config.fallback_api_url() {
        let fallback = DeeplxTranslator::new(url, request_timeout).map_err(translator_error)?;
        processor = processor.with_fallback(Arc::new(fallback));
        tracing::info!("已启用备用翻译服务: {}", url);
    }
    let processor = Arc::new(processor);

    let builder = HtmlBuilder::new(config.builder_config())
        .map_err(|e| MirrorError::Config(format!("读取模板失败: {}", e)))?;

    let transformer = ContentTransformer::new(
        base_url.clone(),
        config.start_page()?,
        Arc::new(dictionary),
        Arc::new(resources),
        Arc::clone(&processor),
        Arc::new(builder),
        config.transform_settings(),
    );

    let fetcher = HttpFetcher::new(base_url, &config.site.user_agent, timeout)?;
    let writer = FsPageWriter::new(config.output_dir());

    let pipeline = PagePipeline::new(
        Arc::new(fetcher),
        Arc::new(writer),
        Arc::new(transformer),
        timeout,
    );
    Ok((pipeline, processor))
}
