//! Chunked asymmetric encryption.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use rsa::{
	Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey, pkcs1::DecodeRsaPublicKey,
	pkcs8::DecodePublicKey, rand_core::OsRng, traits::PublicKeyParts,
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, EncryptionError},
	seal::chunk,
};

/// Failure reported by a [`ChunkCipher`].
pub type CipherError = Box<dyn StdError + Send + Sync>;

/// PKCS#1 v1.5 padding overhead in bytes.
const PKCS1_PADDING: usize = 11;

/// Encryption primitive with a bounded plaintext size per operation.
pub trait ChunkCipher
where
	Self: Send + Sync,
{
	/// Maximum plaintext bytes accepted by one [`Self::encrypt_chunk`] call.
	fn max_plaintext_len(&self) -> usize;

	/// Encrypts one chunk into raw ciphertext bytes.
	fn encrypt_chunk(&self, chunk: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// RSA PKCS#1 v1.5 public-key cipher.
#[derive(Clone, Debug)]
pub struct RsaChunkCipher {
	key: RsaPublicKey,
}
impl RsaChunkCipher {
	/// Wraps a parsed public key.
	pub fn new(key: RsaPublicKey) -> Self {
		Self { key }
	}

	/// Parses a PKCS#1 (`RSA PUBLIC KEY`) or SPKI (`PUBLIC KEY`) PEM document.
	///
	/// The base64 body may be wrapped at any width, including a single line.
	pub fn from_pem(pem: &str) -> Result<Self, ConfigError> {
		let body = pem
			.lines()
			.map(str::trim)
			.filter(|line| !line.starts_with("-----"))
			.collect::<String>();
		let der = STANDARD
			.decode(body)
			.map_err(|e| ConfigError::InvalidPublicKey { source: Box::new(e) })?;
		let key = RsaPublicKey::from_pkcs1_der(&der)
			.or_else(|_| RsaPublicKey::from_public_key_der(&der))
			.map_err(|e| ConfigError::InvalidPublicKey { source: Box::new(e) })?;

		Ok(Self::new(key))
	}
}
impl ChunkCipher for RsaChunkCipher {
	fn max_plaintext_len(&self) -> usize {
		self.key.size().saturating_sub(PKCS1_PADDING)
	}

	fn encrypt_chunk(&self, chunk: &[u8]) -> Result<Vec<u8>, CipherError> {
		Ok(self.key.encrypt(&mut OsRng, Pkcs1v15Encrypt, chunk)?)
	}
}

/// Encrypts `plaintext` chunk by chunk and base64-encodes the concatenated ciphertexts.
///
/// Characters outside the Basic Multilingual Plane are escaped first. Any chunk failure aborts
/// the whole operation.
pub fn encrypt(cipher: &dyn ChunkCipher, plaintext: &str) -> Result<String, EncryptionError> {
	let normalized = chunk::escape_astral(plaintext);
	let mut sealed = Vec::new();
	let mut offset = 0;

	for part in chunk::split_chunks(&normalized, cipher.max_plaintext_len())? {
		let ciphertext = cipher
			.encrypt_chunk(part.as_bytes())
			.map_err(|source| EncryptionError::chunk(offset, source))?;

		sealed.extend_from_slice(&ciphertext);
		offset += part.len();
	}

	Ok(STANDARD.encode(sealed))
}

/// Private-key counterpart of [`RsaChunkCipher`], used to verify sealed payloads.
#[derive(Clone, Debug)]
pub struct RsaChunkDecryptor {
	key: RsaPrivateKey,
}
impl RsaChunkDecryptor {
	/// Wraps a private key.
	pub fn new(key: RsaPrivateKey) -> Self {
		Self { key }
	}

	/// Decodes base64 `sealed`, decrypts it block by block, and returns the normalized
	/// plaintext.
	pub fn decrypt(&self, sealed: &str) -> Result<String, EncryptionError> {
		let ciphertext = STANDARD.decode(sealed)?;
		let block = self.key.size();

		if ciphertext.len() % block != 0 {
			return Err(EncryptionError::Misaligned { len: ciphertext.len(), block });
		}

		let mut plaintext = Vec::with_capacity(ciphertext.len());

		for (index, chunk) in ciphertext.chunks(block).enumerate() {
			let decrypted = self.key.decrypt(Pkcs1v15Encrypt, chunk).map_err(|e| {
				EncryptionError::Decrypt { offset: index * block, source: Box::new(e) }
			})?;

			plaintext.extend_from_slice(&decrypted);
		}

		Ok(String::from_utf8(plaintext)?)
	}
}
