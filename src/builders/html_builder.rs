//! HTML 构建器模块
//!
//! 负责把转换后的各部分内容组装成最终文档：模板、改写后的头部、正文片段、
//! body 末尾脚本，以及返回主页按钮和随机事实占位符等辅助内容。
//! 也负责生成重定向页面。

use std::fs;
use std::path::Path;

use crate::utils::PageId;

/// 默认文档模板
///
/// 占位符：`{{LANG}}`、`{{PAGE_TITLE}}`、`{{HEAD}}`、`{{BODY_CLASS}}`、
/// `{{HOME_BUTTON}}`、`{{PAGE_CONTENT}}`、`{{BODY_SCRIPTS}}`
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html><html lang="{{LANG}}" dir="ltr"><head><meta charset="UTF-8"><title>{{PAGE_TITLE}}</title>{{HEAD}}<style>@import url('https://fonts.googleapis.com/css2?family=M+PLUS+1p&family=Rubik&display=swap');body{font-family:'Rubik','M PLUS 1p',sans-serif;background-color:#001926 !important;}#mw-main-container{max-width:1200px;margin:20px auto;background-color:#001926;padding:20px;}</style></head><body class="{{BODY_CLASS}}"><div id="mw-main-container">{{HOME_BUTTON}}<div class="main-content"><div class="mw-body" id="content" role="main"><a id="top"></a><div class="mw-body-content" id="bodyContent"><div id="siteNotice"></div><div id="mw-content-text" class="mw-content-ltr mw-parser-output" lang="{{LANG}}" dir="ltr">{{PAGE_CONTENT}}</div></div></div></div></div>{{BODY_SCRIPTS}}</body></html>"#;

/// 随机事实占位符的元素 ID
pub const FACT_PLACEHOLDER_ID: &str = "dynamic-fact-placeholder";

const HOME_BUTTON_STYLE: &str = "display: inline-block; margin: 0 0 25px 0; padding: 12px 24px; background-color: #BFD5FF; color: #001926; text-decoration: none; font-weight: bold; border-radius: 8px; font-family: 'Rubik', 'M PLUS 1p', sans-serif; box-shadow: 0 4px 8px rgba(0,0,0,0.2);";

#[derive(Debug, Clone)]
pub struct HtmlBuilderConfig {
    /// 外部模板文件，未设置时使用内置模板
    pub template_path: Option<String>,
    /// 输出文档的语言
    pub lang: String,
    /// 返回主页按钮的文字
    pub home_label: String,
    /// 随机事实数据文件（相对输出目录）
    pub facts_file: String,
}

impl Default for HtmlBuilderConfig {
    fn default() -> Self {
        Self {
            template_path: None,
            lang: "zh-CN".to_string(),
            home_label: "返回主页".to_string(),
            facts_file: "facts.json".to_string(),
        }
    }
}

/// 组装一页所需的全部部件
#[derive(Debug, Clone, Default)]
pub struct PageParts {
    pub title: String,
    pub head_elements: Vec<String>,
    pub body_classes: String,
    /// 返回主页的目标页面，起始页本身为 `None`
    pub home_page: Option<PageId>,
    pub content: String,
    pub tail_elements: Vec<String>,
}

pub struct HtmlBuilder {
    config: HtmlBuilderConfig,
    template: String,
}

impl HtmlBuilder {
    /// 创建构建器；配置了外部模板时读取模板文件
    pub fn new(config: HtmlBuilderConfig) -> std::io::Result<Self> {
        let template = match config.template_path.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(path) => {
                let expanded = shellexpand::tilde(path).into_owned();
                fs::read_to_string(Path::new(&expanded))?
            }
            None => DEFAULT_TEMPLATE.to_string(),
        };

        Ok(Self { config, template })
    }

    pub fn config(&self) -> &HtmlBuilderConfig {
        &self.config
    }

    /// 构建完整的 HTML 页面
    pub fn build_page(&self, parts: &PageParts) -> String {
        let home_button = parts
            .home_page
            .as_ref()
            .map(|page| self.home_button(page))
            .unwrap_or_default();

        // 正文最后替换，正文里出现的占位符文本不会被误替换
        self.template
            .replace("{{LANG}}", &escape_attr(&self.config.lang))
            .replace("{{PAGE_TITLE}}", &escape_text(&parts.title))
            .replace("{{HEAD}}", &parts.head_elements.join("\n    "))
            .replace("{{BODY_CLASS}}", &escape_attr(&parts.body_classes))
            .replace("{{HOME_BUTTON}}", &home_button)
            .replace("{{BODY_SCRIPTS}}", &parts.tail_elements.join("\n    "))
            .replace("{{PAGE_CONTENT}}", &parts.content)
    }

    /// 返回主页按钮
    pub fn home_button(&self, home_page: &PageId) -> String {
        format!(
            r#"<a href="{}" style="{}">{}</a>"#,
            escape_attr(&home_page.relative_href()),
            HOME_BUTTON_STYLE,
            escape_text(&self.config.home_label)
        )
    }

    /// 替换随机事实内容的占位符
    pub fn fact_placeholder(&self) -> String {
        format!(
            r#"<p id="{}" style="margin:0;">正在加载有趣的事实...</p>"#,
            FACT_PLACEHOLDER_ID
        )
    }

    /// 浏览时从事实数据文件中随机选取一条填入占位符的脚本
    pub fn fact_script(&self) -> String {
        format!(
            r#"<script>document.addEventListener('DOMContentLoaded', function() {{ const placeholder = document.getElementById('{id}'); if (!placeholder) {{ return; }} fetch('./{file}').then(function(response) {{ if (!response.ok) {{ throw new Error('网络响应错误，状态码: ' + response.status); }} return response.json(); }}).then(function(facts) {{ if (Array.isArray(facts) && facts.length > 0) {{ placeholder.innerHTML = facts[Math.floor(Math.random() * facts.length)].cn; }} else {{ placeholder.innerHTML = '暂时没有可显示的事实。'; }} }}).catch(function(error) {{ console.error('加载或显示事实时出错:', error); placeholder.innerHTML = '加载事实失败，请稍后再试。'; }}); }});</script>"#,
            id = FACT_PLACEHOLDER_ID,
            file = escape_js(&self.config.facts_file)
        )
    }

    /// 重定向页面：meta 刷新、脚本跳转，以及手动跳转链接
    pub fn redirect_stub(&self, target: &PageId) -> String {
        let href = target.relative_href();
        let attr = escape_attr(&href);
        format!(
            r#"<!DOCTYPE html><html lang="{lang}"><head><meta charset="UTF-8"><title>正在重定向...</title><meta http-equiv="refresh" content="0; url={attr}"><link rel="canonical" href="{attr}"><script>window.location.replace("{js}");</script></head><body><p>如果您的浏览器没有自动跳转，请 <a href="{attr}">点击这里</a>。</p></body></html>"#,
            lang = escape_attr(&self.config.lang),
            attr = attr,
            js = escape_js(&href)
        )
    }
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

fn escape_js(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\'', "\\'")
        .replace('<', "\\u003c")
}
