//! Source file fetcher with a local staging directory.
//!
//! Sources come from one of two fixed remote endpoints:
//! - the NOAA surface climatology bucket, fetched as plain files
//! - the USGS GMTED2010 grid archive, fetched as zip archives and unpacked
//!
//! A source that already exists in the staging directory is never fetched
//! again, so an interrupted run can simply be restarted.

use crate::{FetchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// NOAA S3 base URL for the surface climatology files.
pub const CLIMO_BASE_URL: &str =
    "https://noaa-nws-global-pds.s3.amazonaws.com/fix/sfc_climo/20230925";

/// USGS base URL for the GMTED2010 zipped grids.
pub const TOPO_BASE_URL: &str =
    "https://edcintl.cr.usgs.gov/downloads/sciweb1/shared/topo/downloads/GMTED/Grid_ZipFiles";

/// Suffix of the temporary file a download is streamed into.
const PARTIAL_SUFFIX: &str = "part";

/// Base locations of the two remote endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Endpoint serving plain source files.
    pub climo_base_url: String,
    /// Endpoint serving zip archives.
    pub topo_base_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            climo_base_url: CLIMO_BASE_URL.to_string(),
            topo_base_url: TOPO_BASE_URL.to_string(),
        }
    }
}

/// How a source file is obtained from the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Remote {
    /// Plain file on the climatology endpoint, copied byte for byte.
    File,
    /// Zip archive on the topography endpoint; every member is extracted
    /// into the staging directory and the source is one of them.
    Archive {
        /// Archive file name on the remote.
        archive: String,
    },
}

/// A named source file and where it comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// File (or extracted directory) name inside the staging directory.
    pub name: String,
    /// Remote origin.
    pub remote: Remote,
}

impl SourceFile {
    /// A plain file on the climatology endpoint.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote: Remote::File,
        }
    }

    /// A source unpacked from a zip archive on the topography endpoint.
    pub fn archive(name: impl Into<String>, archive: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote: Remote::Archive {
                archive: archive.into(),
            },
        }
    }
}

/// Outcome of [`Fetcher::ensure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// The destination existed; nothing was fetched.
    AlreadyPresent(PathBuf),
    /// A plain file was downloaded.
    Downloaded {
        /// Local path of the file.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// An archive was downloaded and unpacked.
    Extracted {
        /// Local path of the source inside the unpacked members.
        path: PathBuf,
        /// Number of archive members.
        members: usize,
        /// Archive size in bytes.
        bytes: u64,
    },
}

impl Acquisition {
    /// Local path of the acquired source.
    pub fn path(&self) -> &Path {
        match self {
            Acquisition::AlreadyPresent(path) => path,
            Acquisition::Downloaded { path, .. } => path,
            Acquisition::Extracted { path, .. } => path,
        }
    }

    /// Whether anything was transferred over the network.
    pub fn was_fetched(&self) -> bool {
        !matches!(self, Acquisition::AlreadyPresent(_))
    }
}

/// Byte-stream access to a remote location.
pub trait Transport {
    /// Stream the body at `url` into `sink`, returning the number of bytes copied.
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

/// Blocking HTTP(S) transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport with a connect timeout and no overall timeout,
    /// since some archives take a long time to transfer.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(60))
            .timeout(None::<Duration>)
            .build()
            .map_err(|source| FetchError::Transport {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }

    /// Use an already configured client.
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::Naming {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut response = self.client.get(parsed).send().map_err(|source| {
            if source.is_builder() {
                FetchError::Naming {
                    url: url.to_string(),
                    reason: source.to_string(),
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    source,
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut sink = TrackedSink::new(sink);
        match response.copy_to(&mut sink) {
            Ok(bytes) => Ok(bytes),
            Err(source) => match sink.take_error() {
                Some(e) => Err(FetchError::Io(e)),
                None => Err(FetchError::Transport {
                    url: url.to_string(),
                    source,
                }),
            },
        }
    }
}

/// Writer that keeps the first local write failure, so it is not mistaken
/// for a failure reading the response body.
struct TrackedSink<'a> {
    inner: &'a mut dyn Write,
    error: Option<io::Error>,
}

impl<'a> TrackedSink<'a> {
    fn new(inner: &'a mut dyn Write) -> Self {
        Self { inner, error: None }
    }

    fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn record(&mut self, e: io::Error) -> io::Error {
        let kind = e.kind();
        if self.error.is_none() {
            self.error = Some(e);
        }
        io::Error::from(kind)
    }
}

impl Write for TrackedSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.write(buf) {
            Ok(n) => Ok(n),
            Err(e) => Err(self.record(e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.flush() {
            Ok(()) => Ok(()),
            Err(e) => Err(self.record(e)),
        }
    }
}

/// Download statistics for the fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Number of remote objects downloaded this session.
    pub files_downloaded: usize,
    /// Total bytes downloaded this session.
    pub bytes_downloaded: u64,
}

/// Fetches source files into a staging directory.
pub struct Fetcher<T: Transport = HttpTransport> {
    /// Remote transport.
    transport: T,
    /// Remote endpoint locations.
    remote: RemoteConfig,
    /// Where sources are stored.
    staging_dir: PathBuf,
    /// Session statistics.
    stats: DownloadStats,
}

impl<T: Transport> std::fmt::Debug for Fetcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("staging_dir", &self.staging_dir)
            .field("remote", &self.remote)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Fetcher<HttpTransport> {
    /// Create a fetcher backed by the HTTP transport.
    pub fn http<P: AsRef<Path>>(staging_dir: P, remote: RemoteConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new()?, staging_dir, remote))
    }
}

impl<T: Transport> Fetcher<T> {
    /// Create a fetcher over an arbitrary transport.
    pub fn new<P: AsRef<Path>>(transport: T, staging_dir: P, remote: RemoteConfig) -> Self {
        Self {
            transport,
            remote,
            staging_dir: staging_dir.as_ref().to_path_buf(),
            stats: DownloadStats::default(),
        }
    }

    /// Get the staging directory.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get download statistics for this session.
    pub fn download_stats(&self) -> DownloadStats {
        self.stats
    }

    /// Local path a source is (or will be) stored at.
    pub fn local_path(&self, source: &SourceFile) -> PathBuf {
        self.staging_dir.join(&source.name)
    }

    /// Remote URL a source (or its archive) is fetched from.
    pub fn remote_url(&self, source: &SourceFile) -> String {
        match &source.remote {
            Remote::File => join_url(&self.remote.climo_base_url, &source.name),
            Remote::Archive { archive } => join_url(&self.remote.topo_base_url, archive),
        }
    }

    /// Make sure a source exists locally, fetching it if absent.
    pub fn ensure(&mut self, source: &SourceFile) -> Result<Acquisition> {
        let dest = self.local_path(source);
        if dest.exists() {
            info!("{} already exists, skip downloading", dest.display());
            return Ok(Acquisition::AlreadyPresent(dest));
        }

        fs::create_dir_all(&self.staging_dir)?;
        let url = self.remote_url(source);
        info!("{} does not exist, downloading from {}", dest.display(), url);

        match &source.remote {
            Remote::File => {
                let bytes = self.download(&url, &dest)?;
                info!("Saved {} ({} bytes)", dest.display(), bytes);
                Ok(Acquisition::Downloaded { path: dest, bytes })
            }
            Remote::Archive { archive } => {
                let archive_path = self.staging_dir.join(archive);
                let bytes = self.download(&url, &archive_path)?;
                let members = match extract_archive(&archive_path, &self.staging_dir) {
                    Ok(members) => members,
                    Err(e) => {
                        let _ = fs::remove_file(&archive_path);
                        return Err(e);
                    }
                };
                fs::remove_file(&archive_path)?;
                info!(
                    "Extracted {} members of {} into {}",
                    members,
                    archive,
                    self.staging_dir.display()
                );
                if !dest.exists() {
                    warn!("{} was not among the members of {}", source.name, archive);
                }
                Ok(Acquisition::Extracted {
                    path: dest,
                    members,
                    bytes,
                })
            }
        }
    }

    /// Stream `url` into `dest` through a temporary file so a failed
    /// transfer never leaves a file at `dest`.
    fn download(&mut self, url: &str, dest: &Path) -> Result<u64> {
        let partial = partial_path(dest);
        let result = (|| -> Result<u64> {
            let mut file = fs::File::create(&partial)?;
            let bytes = self.transport.get(url, &mut file)?;
            file.flush()?;
            Ok(bytes)
        })();

        match result {
            Ok(bytes) => {
                fs::rename(&partial, dest)?;
                self.stats.files_downloaded += 1;
                self.stats.bytes_downloaded += bytes;
                Ok(bytes)
            }
            Err(e) => {
                let _ = fs::remove_file(&partial);
                Err(e)
            }
        }
    }
}

/// Unpack every member of a zip archive into `dir`.
///
/// Members are unpacked into a scratch directory inside `dir` and moved into
/// place only once the whole archive has been read, so a damaged archive
/// leaves nothing behind.
fn extract_archive(archive_path: &Path, dir: &Path) -> Result<usize> {
    let archive_name = archive_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| FetchError::Extraction {
        archive: archive_name.clone(),
        source,
    })?;

    let scratch = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(dir)?;
    archive
        .extract(scratch.path())
        .map_err(|source| FetchError::Extraction {
            archive: archive_name,
            source,
        })?;

    for entry in fs::read_dir(scratch.path())? {
        let entry = entry?;
        let target = dir.join(entry.file_name());
        if target.is_dir() {
            fs::remove_dir_all(&target)?;
        } else if target.exists() {
            fs::remove_file(&target)?;
        }
        fs::rename(entry.path(), &target)?;
    }
    Ok(archive.len())
}

fn join_url(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_url_plain() {
        let fetcher = Fetcher::new(NoTransport, "./staging", RemoteConfig::default());
        let source = SourceFile::file("maximum_snow_albedo.0.05.nc");
        assert_eq!(
            fetcher.remote_url(&source),
            "https://noaa-nws-global-pds.s3.amazonaws.com/fix/sfc_climo/20230925/maximum_snow_albedo.0.05.nc"
        );
    }

    #[test]
    fn test_remote_url_archive() {
        let remote = RemoteConfig {
            climo_base_url: "https://a.example".to_string(),
            topo_base_url: "https://b.example/grids/".to_string(),
        };
        let fetcher = Fetcher::new(NoTransport, "./staging", remote);
        let source = SourceFile::archive("mn30_grd", "mn30_grd.zip");
        assert_eq!(fetcher.remote_url(&source), "https://b.example/grids/mn30_grd.zip");
        assert_eq!(fetcher.local_path(&source), PathBuf::from("./staging/mn30_grd"));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("staging/LAI_climo_pnnl.nc")),
            PathBuf::from("staging/LAI_climo_pnnl.nc.part")
        );
    }

    #[test]
    fn test_acquisition_was_fetched() {
        let present = Acquisition::AlreadyPresent(PathBuf::from("a"));
        let fetched = Acquisition::Downloaded {
            path: PathBuf::from("a"),
            bytes: 10,
        };
        assert!(!present.was_fetched());
        assert!(fetched.was_fetched());
        assert_eq!(fetched.path(), Path::new("a"));
    }

    #[test]
    fn test_invalid_url_is_naming_error() {
        let transport = HttpTransport::new().unwrap();
        let mut sink = Vec::new();
        let err = transport.get("not a url", &mut sink).unwrap_err();
        assert_eq!(err.kind(), crate::FetchErrorKind::Naming);
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tracked_sink_keeps_first_write_error() {
        let mut disk = FullDisk;
        let mut sink = TrackedSink::new(&mut disk);
        assert!(sink.write_all(b"payload").is_err());
        assert!(sink.write(b"more").is_err());

        let err = sink.take_error().unwrap();
        assert_eq!(err.to_string(), "no space left on device");
        assert!(sink.take_error().is_none());
    }

    #[test]
    fn test_tracked_sink_passes_writes_through() {
        let mut buf = Vec::new();
        let mut sink = TrackedSink::new(&mut buf);
        sink.write_all(b"abc").unwrap();
        sink.flush().unwrap();
        assert!(sink.take_error().is_none());
        assert_eq!(buf, b"abc");
    }

    struct NoTransport;

    impl Transport for NoTransport {
        fn get(&self, url: &str, _sink: &mut dyn Write) -> Result<u64> {
            panic!("unexpected fetch of {}", url);
        }
    }
}
