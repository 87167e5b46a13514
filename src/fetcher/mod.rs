pub mod http_fetcher;
pub mod pagination;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;
pub use pagination::fetch_items;

/// A fetched page, before any status or content-type checks.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    /// Raw `Content-Type` header value, empty when absent.
    pub content_type: String,
    pub body: String,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`. Only transport failures are errors; HTTP statuses are
    /// reported through [`Page::status`].
    async fn fetch(&self, url: &str) -> Result<Page>;
}

#[cfg(test)]
pub(crate) mod stub {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::app::RssliteError;

    /// Serves canned pages and records every requested URL.
    #[derive(Default)]
    pub struct StubFetcher {
        pages: Mutex<HashMap<String, std::result::Result<Page, String>>>,
        hits: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(self, url: &str, content_type: &str, body: &str) -> Self {
            self.set_page(url, content_type, body);
            self
        }

        pub fn set_page(&self, url: &str, content_type: &str, body: &str) {
            self.pages.lock().unwrap().insert(
                url.to_string(),
                Ok(Page {
                    status: 200,
                    content_type: content_type.to_string(),
                    body: body.to_string(),
                }),
            );
        }

        pub fn set_status(&self, url: &str, status: u16) {
            self.pages.lock().unwrap().insert(
                url.to_string(),
                Ok(Page {
                    status,
                    content_type: "text/html".to_string(),
                    body: String::new(),
                }),
            );
        }

        pub fn set_unreachable(&self, url: &str) {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), Err("connection refused".to_string()));
        }

        pub fn hits(&self) -> Vec<String> {
            self.hits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Page> {
            self.hits.lock().unwrap().push(url.to_string());
            match self.pages.lock().unwrap().get(url) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(reason)) => Err(RssliteError::Other(reason.clone())),
                None => Ok(Page {
                    status: 404,
                    content_type: "text/html".to_string(),
                    body: String::new(),
                }),
            }
        }
    }
}
