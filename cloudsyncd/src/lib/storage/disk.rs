use camino::Utf8Path;
use cloudsync::{api_bail, api_error, RemoteEntries};
use url::Url;

use super::{Deleted, UploadHandle};

/// Client of the disk REST API, bound to one folder.
#[derive(Debug, Clone)]
pub struct Disk {
    client: reqwest::Client,
    base_url: String,
    folder: String,
    token: String,
    user_agent: String,
    page_size: usize,
}

impl Disk {
    pub fn new(
        client: reqwest::Client,
        base_url: &Url,
        token: &str,
        folder: &str,
    ) -> cloudsync::Result<Self> {
        if token.trim().is_empty() {
            cloudsync::config_bail!("No authorization token for the disk");
        }
        if folder.trim().is_empty() {
            cloudsync::config_bail!("No cloud folder specified");
        }
        let user_agent = format!("cloudsyncd/{}", env!("CARGO_PKG_VERSION"));
        let disk = Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            folder: normalize_folder(folder),
            token: token.to_string(),
            user_agent,
            page_size: DEFAULT_PAGE_SIZE,
        };
        log::info!("Initializing disk storage in {} ({})", disk.folder, disk.base_url);
        Ok(disk)
    }

    /// Number of items requested per listing page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        assert!(page_size > 0);
        self.page_size = page_size;
        self
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    fn item_path(&self, name: &str) -> String {
        if self.folder.ends_with('/') {
            format!("{}{name}", self.folder)
        } else {
            format!("{}/{name}", self.folder)
        }
    }
}

impl super::ListEntries for Disk {
    async fn list_entries(&self) -> cloudsync::Result<RemoteEntries> {
        log::trace!("listing entries of {}", self.folder);
        let mut entries = RemoteEntries::new();
        let mut offset = 0;
        loop {
            let list = self.resources_list(offset).await?.embedded;
            let count = list.items.len();
            for (name, mtime) in map_items(&self.folder, list.items)? {
                entries.insert(name, mtime);
            }
            offset += count;
            let more = match list.total {
                Some(total) => count > 0 && (offset as u64) < total,
                None => count == self.page_size,
            };
            if !more {
                break;
            }
        }
        Ok(entries)
    }
}

impl super::RequestUpload for Disk {
    async fn request_upload(
        &self,
        name: &str,
        overwrite: bool,
    ) -> cloudsync::Result<Option<UploadHandle>> {
        let path = self.item_path(name);
        let link = self.resources_upload(&path, overwrite).await?;
        link.map(|link| {
            let href = Url::parse(&link.href)
                .map_err(|err| api_error!("Invalid upload link for {path}: {err}"))?;
            Ok(UploadHandle::new(href))
        })
        .transpose()
    }
}

impl super::Upload for Disk {
    async fn upload(&self, handle: &UploadHandle, path: &Utf8Path) -> cloudsync::Result<()> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|err| cloudsync::io_error!("Can't open {path}: {err}"))?;
        let size = file
            .metadata()
            .await
            .map_err(|err| cloudsync::io_error!("Can't stat {path}: {err}"))?
            .len();
        log::trace!("streaming {path} ({size} bytes)");
        self.put_file(handle.href(), file, size).await
    }
}

impl super::Delete for Disk {
    async fn delete(&self, name: &str) -> cloudsync::Result<Deleted> {
        let path = self.item_path(name);
        self.resources_delete(&path).await
    }
}

impl super::RemoteStore for Disk {}

const DEFAULT_PAGE_SIZE: usize = 100;

const DISK_SCHEME: &str = "disk:";

fn strip_scheme(path: &str) -> &str {
    path.strip_prefix(DISK_SCHEME).unwrap_or(path)
}

/// Drops trailing slashes, but keeps the one of the disk root (`/` or `disk:/`).
fn normalize_folder(folder: &str) -> String {
    let trimmed = folder.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed == DISK_SCHEME {
        format!("{trimmed}/")
    } else {
        trimmed.to_string()
    }
}

/// Name of `path` relative to `folder`.
/// Both may or may not carry the `disk:` scheme.
/// Fails if `path` is not a direct child of `folder`.
pub fn relative_name<'a>(folder: &str, path: &'a str) -> cloudsync::Result<&'a str> {
    let folder_rel = strip_scheme(folder).trim_matches('/');
    let path_rel = strip_scheme(path).trim_start_matches('/');
    let name = if folder_rel.is_empty() {
        Some(path_rel)
    } else {
        path_rel
            .strip_prefix(folder_rel)
            .and_then(|rest| rest.strip_prefix('/'))
    };
    match name {
        Some(name) if !name.is_empty() && !name.contains('/') => Ok(name),
        _ => {
            api_bail!("'{path}' is not directly under '{folder}'")
        }
    }
}

fn map_items(
    folder: &str,
    items: Vec<api::Resource>,
) -> cloudsync::Result<Vec<(String, chrono::DateTime<chrono::FixedOffset>)>> {
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        if item.typ == api::ResourceType::Dir {
            log::debug!("skipping remote folder {}", item.path);
            continue;
        }
        let name = relative_name(folder, &item.path)?;
        let mtime = cloudsync::parse_remote_mtime(&item.modified)?;
        entries.push((name.to_string(), mtime));
    }
    Ok(entries)
}

mod api {
    use http::StatusCode;
    use serde::{Deserialize, Serialize};

    use super::utils::{check_response, parse_json, transport_error};
    use crate::storage::Deleted;

    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ResourceType {
        #[default]
        File,
        Dir,
    }

    #[derive(Clone, Debug, Deserialize)]
    pub struct Resource {
        pub path: String,
        pub modified: String,
        #[serde(default, rename = "type")]
        pub typ: ResourceType,
    }

    #[derive(Clone, Debug, Deserialize)]
    pub struct ResourceList {
        pub items: Vec<Resource>,
        pub total: Option<u64>,
    }

    #[derive(Clone, Debug, Deserialize)]
    pub struct Folder {
        #[serde(rename = "_embedded")]
        pub embedded: ResourceList,
    }

    #[derive(Clone, Debug, Deserialize)]
    pub struct Link {
        pub href: String,
    }

    const LIST_FIELDS: &str =
        "_embedded.items.path,_embedded.items.modified,_embedded.items.type,_embedded.total";

    impl super::Disk {
        pub async fn resources_list(&self, offset: usize) -> cloudsync::Result<Folder> {
            let path = "/resources";
            let limit = self.page_size.to_string();
            let offset = offset.to_string();
            let query_params = [
                ("path", self.folder.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
                ("fields", LIST_FIELDS),
            ];

            let res = self.get_query(path, query_params).await?;
            let res = check_response("GET", path, res).await?;
            parse_json(res).await
        }

        /// Returns `None` if the API refuses because the resource exists.
        pub async fn resources_upload(
            &self,
            target: &str,
            overwrite: bool,
        ) -> cloudsync::Result<Option<Link>> {
            let path = "/resources/upload";
            let query_params = [
                ("path", target),
                ("overwrite", if overwrite { "true" } else { "false" }),
            ];

            let res = self.get_query(path, query_params).await?;
            if res.status() == StatusCode::CONFLICT {
                log::debug!("GET {path} for {target}: already exists");
                return Ok(None);
            }
            let res = check_response("GET", path, res).await?;
            Ok(Some(parse_json(res).await?))
        }

        pub async fn resources_delete(&self, target: &str) -> cloudsync::Result<Deleted> {
            let path = "/resources";
            let query_params = [("path", target), ("permanently", "false")];

            let res = self.delete_query(path, query_params).await?;
            if res.status() == StatusCode::NOT_FOUND {
                return Ok(Deleted::AlreadyAbsent);
            }
            check_response("DELETE", path, res).await?;
            Ok(Deleted::Done)
        }

        pub async fn put_file(
            &self,
            href: &url::Url,
            file: tokio::fs::File,
            size: u64,
        ) -> cloudsync::Result<()> {
            use reqwest::header;

            let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(file));
            let res = self
                .client
                .put(href.clone())
                .header(header::USER_AGENT, &self.user_agent)
                .header(header::CONTENT_LENGTH, size)
                .body(body)
                .send()
                .await
                .map_err(|err| transport_error("PUT", href.path(), err))?;
            check_response("PUT", href.path(), res).await?;
            Ok(())
        }
    }
}

mod utils {
    use std::borrow::Borrow;

    use cloudsync::api_error;
    use reqwest::{header, Response};
    use serde::de::DeserializeOwned;
    use url::Url;

    pub fn transport_error(method: &str, path: &str, err: reqwest::Error) -> cloudsync::Error {
        api_error!("{method} {path} failed: {err}")
    }

    pub async fn check_response(
        method: &str,
        path: &str,
        res: Response,
    ) -> cloudsync::Result<Response> {
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            cloudsync::api_bail!("{method} {path} returned {status}\n{body}");
        }
        Ok(res)
    }

    pub async fn parse_json<T>(res: Response) -> cloudsync::Result<T>
    where
        T: DeserializeOwned,
    {
        let url = res.url().path().to_string();
        let bytes = res
            .bytes()
            .await
            .map_err(|err| transport_error("GET", &url, err))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    impl super::Disk {
        pub async fn get_query<Q, K, V>(
            &self,
            path: &str,
            query_params: Q,
        ) -> cloudsync::Result<Response>
        where
            Q: IntoIterator,
            Q::Item: Borrow<(K, V)>,
            K: AsRef<str>,
            V: AsRef<str>,
        {
            let url = url_with_query(&self.base_url, path, query_params)?;
            self.client
                .get(url)
                .header(header::USER_AGENT, &self.user_agent)
                .header(header::AUTHORIZATION, format!("OAuth {}", self.token))
                .header(header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(|err| transport_error("GET", path, err))
        }

        pub async fn delete_query<Q, K, V>(
            &self,
            path: &str,
            query_params: Q,
        ) -> cloudsync::Result<Response>
        where
            Q: IntoIterator,
            Q::Item: Borrow<(K, V)>,
            K: AsRef<str>,
            V: AsRef<str>,
        {
            let url = url_with_query(&self.base_url, path, query_params)?;
            self.client
                .delete(url)
                .header(header::USER_AGENT, &self.user_agent)
                .header(header::AUTHORIZATION, format!("OAuth {}", self.token))
                .header(header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(|err| transport_error("DELETE", path, err))
        }
    }

    pub fn url_with_query<B, P, Q, K, V>(
        base_url: B,
        path: P,
        query_params: Q,
    ) -> cloudsync::Result<Url>
    where
        B: AsRef<str>,
        P: AsRef<str>,
        Q: IntoIterator,
        Q::Item: Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let base = format!("{}{}", base_url.as_ref(), path.as_ref());
        Url::parse_with_params(&base, query_params)
            .map_err(|err| api_error!("Invalid URL {base}: {err}"))
    }
}
