use async_stream::try_stream;
use camino::{Utf8Path, Utf8PathBuf};
use cloudsync::LocalEntries;
use futures::{Stream, TryStreamExt};
use tokio::fs::{self, DirEntry};

/// The local folder of the sync.
/// Only the regular files directly under the root are considered.
#[derive(Debug, Clone)]
pub struct LocalDir {
    root: Utf8PathBuf,
}

impl LocalDir {
    pub fn new<P>(root: P) -> cloudsync::Result<Self>
    where
        P: AsRef<Utf8Path>,
    {
        let root = root.as_ref();
        let root = root
            .canonicalize_utf8()
            .map_err(|err| cloudsync::config_error!("Can't open local folder {root}: {err}"))?;
        if !root.is_dir() {
            cloudsync::config_bail!("Not a directory: {root}");
        }
        log::info!("Initializing local folder {root}");

        Ok(LocalDir { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn file_path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Lists the regular files of the folder with their local modification time.
    pub async fn entries(&self) -> cloudsync::Result<LocalEntries> {
        self.file_entries().try_collect().await
    }

    fn file_entries(
        &self,
    ) -> impl Stream<Item = cloudsync::Result<(String, chrono::NaiveDateTime)>> + Send + '_ {
        log::trace!("listing entries of {}", self.root);
        try_stream! {
            let mut read_dir = fs::read_dir(&self.root)
                .await
                .map_err(|err| cloudsync::io_error!("Can't read {}: {err}", self.root))?;
            loop {
                let direntry = read_dir
                    .next_entry()
                    .await
                    .map_err(|err| cloudsync::io_error!("Can't read {}: {err}", self.root))?;
                match direntry {
                    None => break,
                    Some(direntry) => {
                        if let Some(entry) = map_direntry(&direntry).await? {
                            yield entry;
                        }
                    }
                }
            }
        }
    }
}

async fn map_direntry(
    direntry: &DirEntry,
) -> cloudsync::Result<Option<(String, chrono::NaiveDateTime)>> {
    let Ok(name) = direntry.file_name().into_string() else {
        log::warn!("skipping non UTF-8 file name {:?}", direntry.file_name());
        return Ok(None);
    };
    // follows symlinks, a link to a regular file is synced as a regular file
    let metadata = match fs::metadata(direntry.path()).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("{name} vanished during listing");
            return Ok(None);
        }
        Err(err) => {
            cloudsync::io_bail!("Can't stat {name}: {err}")
        }
    };
    if !metadata.is_file() {
        log::debug!("skipping {name}: not a regular file");
        return Ok(None);
    }
    let mtime = metadata.modified()?;
    Ok(Some((name, cloudsync::local_mtime(mtime))))
}
