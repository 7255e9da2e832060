use std::future::Future;
use std::path::PathBuf;

use reqwest::Client;

use super::TemplateError;

/// Where template documents come from. Files are addressed by their fixed
/// relative names (e.g. `footer.html`).
pub trait TemplateSource: Send + Sync {
    fn fetch(&self, file: &str) -> impl Future<Output = Result<String, TemplateError>> + Send;
}

/// Templates shipped on disk (the crate's `templates/` directory by default).
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    dir: PathBuf,
}

impl FsTemplateSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TemplateSource for FsTemplateSource {
    fn fetch(&self, file: &str) -> impl Future<Output = Result<String, TemplateError>> + Send {
        let path = self.dir.join(file);
        async move {
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| TemplateError::Io { path, source })
        }
    }
}

/// Templates served next to the front end, fetched over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTemplateSource {
    client: Client,
    base_url: String,
}

impl HttpTemplateSource {
    pub fn new(client: Client, base_url: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { client, base_url }
    }
}

impl TemplateSource for HttpTemplateSource {
    fn fetch(&self, file: &str) -> impl Future<Output = Result<String, TemplateError>> + Send {
        let url = format!("{}{}", self.base_url, file);
        let client = self.client.clone();
        async move {
            let resp = client
                .get(&url)
                .send()
                .await
                .map_err(|source| TemplateError::Http { url: url.clone(), source })?;
            if !resp.status().is_success() {
                return Err(TemplateError::Status {
                    url,
                    status: resp.status().as_u16(),
                });
            }
            resp.text()
                .await
                .map_err(|source| TemplateError::Http { url, source })
        }
    }
}
