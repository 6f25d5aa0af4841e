//! Pagination driver
//!
//! Walks a cursor-paginated listing one page at a time. Each page is written
//! before the next one is requested; interactively the operator is asked
//! before every follow-up request.

use crate::error::Result;
use crate::gcp::params::{QueryParams, PAGE_SIZE, PAGE_TOKEN};
use serde_json::Value;
use std::future::Future;
use std::io::Write;

/// Page size used when nothing else is configured
pub const DEFAULT_PAGE_SIZE: u32 = 5;

const NEXT_PAGE_TOKEN: &str = "nextPageToken";

/// One list response
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    body: Value,
}

impl Page {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// Cursor for the following page. An empty token marks the last page,
    /// same as a missing one.
    pub fn next_page_token(&self) -> Option<&str> {
        self.body
            .get(NEXT_PAGE_TOKEN)
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
    }

    /// Result list stored under a resource-specific key
    pub fn items(&self, key: &str) -> &[Value] {
        self.body
            .get(key)
            .and_then(|v| v.as_array())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn as_value(&self) -> &Value {
        &self.body
    }
}

impl From<Value> for Page {
    fn from(body: Value) -> Self {
        Self::new(body)
    }
}

/// Decides whether the next page should be fetched
pub trait Continuation {
    fn show_next(&mut self) -> Result<bool>;
}

impl<F> Continuation for F
where
    F: FnMut() -> Result<bool>,
{
    fn show_next(&mut self) -> Result<bool> {
        self()
    }
}

/// Asks "show next page?" on the terminal, defaulting to no
#[derive(Debug, Default)]
pub struct PromptContinuation;

impl Continuation for PromptContinuation {
    fn show_next(&mut self) -> Result<bool> {
        let answer = dialoguer::Confirm::new()
            .with_prompt("show next page?")
            .default(false)
            .interact()?;
        Ok(answer)
    }
}

/// How pages are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Rendered through the caller's renderer, with a prompt between pages
    Interactive,
    /// Pretty-printed JSON, every page, no prompts
    Raw,
}

impl PageMode {
    pub fn from_raw_flag(raw: bool) -> Self {
        if raw {
            Self::Raw
        } else {
            Self::Interactive
        }
    }
}

/// Outcome of one traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStats {
    /// Pages retrieved and written
    pub pages: usize,
    /// True when the last page had no continuation token
    pub exhausted: bool,
}

#[derive(Debug, Clone)]
pub struct Paginator {
    page_size: u32,
    mode: PageMode,
}

impl Paginator {
    pub fn new(mode: PageMode) -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            mode,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn mode(&self) -> PageMode {
        self.mode
    }

    /// Drive the traversal.
    ///
    /// `retrieve` gets `{pageSize}` for the first call and
    /// `{pageToken, pageSize}` afterwards, the token copied unmodified from
    /// the previous page. `render` turns a page into text for interactive
    /// mode. A retrieval error stops the loop and is returned as is.
    pub async fn run<W, F, Fut, R, C>(
        &self,
        out: &mut W,
        mut retrieve: F,
        mut render: R,
        continuation: &mut C,
    ) -> Result<PageStats>
    where
        W: Write,
        F: FnMut(QueryParams) -> Fut,
        Fut: Future<Output = Result<Value>>,
        R: FnMut(&Page) -> String,
        C: Continuation + ?Sized,
    {
        let mut params = QueryParams::new().with(PAGE_SIZE, self.page_size);
        let mut pages = 0;

        loop {
            let page = Page::from(retrieve(params).await?);
            pages += 1;

            match self.mode {
                PageMode::Raw => writeln!(out, "{}", serde_json::to_string_pretty(page.as_value())?)?,
                PageMode::Interactive => writeln!(out, "{}", render(&page))?,
            }
            out.flush()?;

            let Some(token) = page.next_page_token() else {
                tracing::debug!("Pagination finished after {} page(s)", pages);
                return Ok(PageStats {
                    pages,
                    exhausted: true,
                });
            };

            if self.mode == PageMode::Interactive && !continuation.show_next()? {
                tracing::debug!("Pagination stopped by operator after {} page(s)", pages);
                return Ok(PageStats {
                    pages,
                    exhausted: false,
                });
            }

            params = QueryParams::new()
                .with(PAGE_TOKEN, token)
                .with(PAGE_SIZE, self.page_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_next_page_token_ignores_empty() {
        assert_eq!(Page::new(json!({"nextPageToken": ""})).next_page_token(), None);
        assert_eq!(Page::new(json!({})).next_page_token(), None);
        assert_eq!(
            Page::new(json!({"nextPageToken": "abc"})).next_page_token(),
            Some("abc")
        );
    }

    #[test]
    fn test_items_missing_key_is_empty() {
        let page = Page::new(json!({"agents": [{"name": "a"}]}));
        assert_eq!(page.items("agents").len(), 1);
        assert!(page.items("engines").is_empty());
    }

    #[test]
    fn test_page_size_never_zero() {
        let paginator = Paginator::new(PageMode::Raw).with_page_size(0);
        assert_eq!(paginator.page_size(), 1);
    }

    #[test]
    fn test_single_page_never_prompts() {
        let paginator = Paginator::new(PageMode::Interactive);
        let mut out = Vec::new();
        let mut prompt = || -> Result<bool> { panic!("no prompt expected") };

        let stats = tokio_test::block_on(paginator.run(
            &mut out,
            |_params| async { Ok(json!({"items": []})) },
            |_page| "rendered".to_string(),
            &mut prompt,
        ))
        .unwrap();

        assert_eq!(stats, PageStats { pages: 1, exhausted: true });
        assert_eq!(String::from_utf8(out).unwrap(), "rendered\n");
    }
}
