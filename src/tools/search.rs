//! google_search：外部搜索协作者 + 结果格式化
//!
//! SearchProvider 是黑盒，返回按排名排序的 {title, description, url}；
//! 内置 GoogleScraper 用 reqwest 抓取结果页，regex 切出结果块，html2text 清理标签与实体。

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::react::{AgentEvent, EventSink};
use crate::tools::Tool;

pub const NO_RESULTS: &str = "Search finished, but no relevant results were found.";

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRecord {
    pub title: String,
    pub description: String,
    pub url: String,
}

/// 搜索协作者
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchRecord>, String>;
}

/// Google 结果页抓取
pub struct GoogleScraper {
    client: Client,
    endpoint: String,
}

impl GoogleScraper {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        const USER_AGENT: &str = "Lynx/2.8.6rel.5 libwww-FM/2.14";
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

/// 去除标签并解码实体
fn html_fragment_to_text(fragment: &str) -> String {
    let text = html2text::from_read(fragment.as_bytes(), 10_000)
        .unwrap_or_else(|_| fragment.to_string());
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 从结果页 HTML 中提取结果：每个 /url?q= 链接是一块，块内取标题，链接到下一块之间取摘要
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchRecord> {
    let (Ok(link_re), Ok(title_re), Ok(desc_re)) = (
        Regex::new(r#"(?s)<a href="/url\?q=([^&"]+)[^"]*"[^>]*>(.*?)</a>"#),
        Regex::new(r#"(?s)<h3[^>]*>(.*?)</h3>|<span class="CVA68e[^"]*"[^>]*>(.*?)</span>"#),
        Regex::new(r#"(?s)<span class="FrIlee">(.*?)</span>|<div class="BNeawe s3v9rd AP7Wnd">(.*?)</div>"#),
    ) else {
        return Vec::new();
    };

    let links: Vec<regex::Captures> = link_re.captures_iter(html).collect();
    let mut records = Vec::new();
    for (i, caps) in links.iter().enumerate() {
        if records.len() >= limit {
            break;
        }
        let url = percent_decode(&caps[1]);
        if !url.starts_with("http") {
            continue;
        }
        let title = title_re
            .captures(&caps[2])
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| html_fragment_to_text(m.as_str()))
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        let tail_start = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let tail_end = links
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(html.len());
        let description = desc_re
            .captures(&html[tail_start..tail_end])
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| html_fragment_to_text(m.as_str()))
            .unwrap_or_default();

        records.push(SearchRecord {
            title,
            description,
            url,
        });
    }
    records
}

/// 解码 %XX 序列（Google 的 q= 参数）；非法 UTF-8 时保留原文
fn percent_decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| s.to_string())
}

#[async_trait]
impl SearchProvider for GoogleScraper {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchRecord>, String> {
        let num = (limit + 2).to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("num", num.as_str()), ("hl", "en")])
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Read body: {}", e))?;
        Ok(parse_results(&body, limit))
    }
}

/// 结果格式化：TITLE / DESC / LINK 块
pub fn format_results(records: &[SearchRecord]) -> String {
    if records.is_empty() {
        return NO_RESULTS.to_string();
    }
    let blocks: Vec<String> = records
        .iter()
        .map(|r| format!("TITLE: {}\nDESC: {}\nLINK: {}", r.title, r.description, r.url))
        .collect();
    format!("Latest search results:\n\n{}", blocks.join("\n\n"))
}

/// google_search 工具
pub struct GoogleSearchTool {
    provider: Arc<dyn SearchProvider>,
    max_results: usize,
    sink: Arc<dyn EventSink>,
}

impl GoogleSearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>, max_results: usize, sink: Arc<dyn EventSink>) -> Self {
        Self {
            provider,
            max_results,
            sink,
        }
    }
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn name(&self) -> &str {
        "google_search"
    }

    fn description(&self) -> &str {
        "Search the web for news and facts. Args: {\"args\": \"query\"}"
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = args
            .get("args")
            .and_then(|v| v.as_str())
            .or_else(|| args.get("query").and_then(|v| v.as_str()))
            .unwrap_or("")
            .trim();
        if query.is_empty() {
            return Err("Missing search query in `args`".to_string());
        }
        self.sink.emit(AgentEvent::Searching {
            query: query.to_string(),
        });
        tracing::info!(query = %query, "google_search execute");

        match self.provider.search(query, self.max_results).await {
            Ok(mut records) => {
                records.truncate(self.max_results);
                Ok(format_results(&records))
            }
            Err(e) => Ok(format!("Search failed: {}. Check your internet connection.", e)),
        }
    }
}
