//! Object storage collaborator contract and the pure helpers around it.
//!
//! Uploading itself belongs to a storage SDK; this module fixes the interface the rest of the
//! application programs against, plus the object-key layout and public URL rules.

// std
use std::time::Duration as StdDuration;
// crates.io
use rand::Rng;
use time::Date;
// self
use crate::{_prelude::*, error::ConfigError, seal::SecretCode};

/// Boxed future returned by [`ObjectStorage`] operations.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;
/// Upload progress callback receiving a percentage in `0..=100`.
pub type ProgressFn = dyn Fn(u8) + Send + Sync;

const RANDOM_SEGMENT_LEN: usize = 11;

/// File handed to [`ObjectStorage::upload_file`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
	/// Original file name.
	pub name: String,
	/// MIME type.
	pub content_type: String,
	/// File contents.
	pub bytes: Vec<u8>,
}

/// Result of a completed upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedObject {
	/// Public URL of the object.
	pub url: String,
	/// Object key inside the bucket.
	pub key: String,
}

/// Storage SDK wrapper consumed by the application.
pub trait ObjectStorage
where
	Self: Send + Sync,
{
	/// Uploads `file`, reporting progress through `on_progress` when given.
	fn upload_file<'a>(
		&'a self,
		file: UploadFile,
		on_progress: Option<&'a ProgressFn>,
	) -> StorageFuture<'a, UploadedObject>;

	/// Deletes the object stored under `key`.
	fn delete_file<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()>;

	/// Returns a time-limited URL for `url`.
	fn presigned_url<'a>(
		&'a self,
		url: &'a str,
		expires_in: StdDuration,
	) -> StorageFuture<'a, String>;
}

/// S3-compatible storage settings (PascalCase keys).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StorageConfig {
	/// Custom endpoint; path-style URLs are built from it when present.
	pub endpoint: Option<Url>,
	/// Access key identifier.
	pub access_key_id: Option<String>,
	/// Access key secret.
	pub access_key_secret: Option<SecretCode>,
	/// Target bucket.
	pub bucket: Option<String>,
	/// Region; used for virtual-hosted AWS URLs when no endpoint is set.
	pub region: Option<String>,
	/// Fixed key prefix replacing the date segment.
	pub path: Option<String>,
	/// Identifier of the storage source.
	pub storage_uuid: Option<String>,
}
impl StorageConfig {
	/// Returns the bucket or fails; uploads are impossible without one.
	pub fn require_bucket(&self) -> Result<&str, ConfigError> {
		self.bucket.as_deref().ok_or(ConfigError::MissingStorageField { field: "Bucket" })
	}

	/// Builds `<path or YYYY-MM-DD>/<random base36>/<url-encoded file name>`.
	pub fn object_key(&self, file_name: &str, today: Date, rng: &mut impl Rng) -> String {
		let prefix = match &self.path {
			Some(path) => path.clone(),
			None => {
				format!("{:04}-{:02}-{:02}", today.year(), u8::from(today.month()), today.day())
			},
		};
		let random = (0..RANDOM_SEGMENT_LEN)
			.filter_map(|_| char::from_digit(rng.random_range(0..36), 36))
			.collect::<String>();

		format!("{prefix}/{random}/{}", urlencoding::encode(file_name))
	}

	/// [`Self::object_key`] for the current UTC date and the thread-local RNG.
	pub fn new_object_key(&self, file_name: &str) -> String {
		self.object_key(file_name, OffsetDateTime::now_utc().date(), &mut rand::rng())
	}

	/// Public URL of `key`: path-style from the endpoint, else the AWS virtual-hosted form.
	///
	/// Returns `None` when neither an endpoint nor a region is configured.
	pub fn object_url(&self, key: &str) -> Option<String> {
		let bucket = self.bucket.as_deref().unwrap_or_default();

		if let Some(endpoint) = &self.endpoint {
			let host = endpoint.host_str().unwrap_or_default();
			let authority = match endpoint.port() {
				Some(port) => format!("{host}:{port}"),
				None => host.to_owned(),
			};

			return Some(format!("{}://{authority}/{bucket}/{key}", endpoint.scheme()));
		}

		self.region
			.as_deref()
			.map(|region| format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"))
	}
}

/// Rounded upload percentage; `None` until the total size is known.
pub fn progress_percentage(loaded: u64, total: u64) -> Option<u8> {
	if total == 0 {
		return None;
	}

	let percentage = (loaded.min(total) as f64 / total as f64 * 100.).round();

	Some(percentage as u8)
}
