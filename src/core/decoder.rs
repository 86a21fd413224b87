use crate::core::detect::FormatTag;
use crate::core::fetch::ByteBuffer;
use crate::error::ExtractError;
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;
use tar::Archive;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Extracts an in-memory archive of one known format into a directory.
pub trait Decoder: Send + Sync {
    fn extract(&self, buffer: &ByteBuffer, destination: &Path) -> Result<(), ExtractError>;
}

pub struct ZipDecoder;

impl Decoder for ZipDecoder {
    fn extract(&self, buffer: &ByteBuffer, destination: &Path) -> Result<(), ExtractError> {
        let mut archive = ZipArchive::new(buffer.cursor()).map_err(ExtractError::malformed)?;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(ExtractError::malformed)?;
            let outpath = match file.enclosed_name() {
                Some(path) => destination.join(path),
                None => {
                    warn!("Skipping zip entry outside destination: {}", file.name());
                    continue;
                }
            };

            if file.is_dir() {
                fs::create_dir_all(&outpath).map_err(|e| ExtractError::io(&outpath, e))?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
            }
            let mut outfile = File::create(&outpath).map_err(|e| ExtractError::io(&outpath, e))?;
            std::io::copy(&mut file, &mut outfile).map_err(|e| ExtractError::io(&outpath, e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))
                        .map_err(|e| ExtractError::io(&outpath, e))?;
                }
            }

            debug!("Extracted {}", outpath.display());
        }

        Ok(())
    }
}

pub struct TarGzDecoder;

impl Decoder for TarGzDecoder {
    fn extract(&self, buffer: &ByteBuffer, destination: &Path) -> Result<(), ExtractError> {
        if buffer.is_empty() {
            return Err(ExtractError::decompression("empty input"));
        }

        let mut decompressed = Vec::new();
        GzDecoder::new(buffer.cursor())
            .read_to_end(&mut decompressed)
            .map_err(ExtractError::decompression)?;

        let mut archive = Archive::new(Cursor::new(decompressed));
        let entries = archive.entries().map_err(ExtractError::malformed)?;

        let mut count = 0usize;
        for entry in entries {
            let mut entry = entry.map_err(ExtractError::malformed)?;
            let path = entry.path().map_err(ExtractError::malformed)?.into_owned();

            if count == 0 {
                fs::create_dir_all(destination).map_err(|e| ExtractError::io(destination, e))?;
            }
            count += 1;

            let unpacked = entry
                .unpack_in(destination)
                .map_err(|e| ExtractError::io(destination.join(&path), e))?;
            if unpacked {
                debug!("Extracted {}", destination.join(&path).display());
            } else {
                warn!("Skipping tar entry outside destination: {}", path.display());
            }
        }

        if count == 0 {
            return Err(ExtractError::malformed("empty tar archive"));
        }

        Ok(())
    }
}

static STANDARD: LazyLock<DecoderRegistry> = LazyLock::new(DecoderRegistry::default);

/// Maps each [`FormatTag`] to the decoder that handles it.
pub struct DecoderRegistry {
    decoders: HashMap<FormatTag, Box<dyn Decoder>>,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::empty()
            .with(FormatTag::Zip, ZipDecoder)
            .with(FormatTag::TarGz, TarGzDecoder)
    }
}

impl DecoderRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// The process-wide registry holding the built-in decoders.
    pub fn standard() -> &'static DecoderRegistry {
        &STANDARD
    }

    pub fn with<D: Decoder + 'static>(mut self, tag: FormatTag, decoder: D) -> Self {
        self.decoders.insert(tag, Box::new(decoder));
        self
    }

    pub fn resolve(&self, tag: FormatTag) -> Result<&dyn Decoder, ExtractError> {
        self.decoders
            .get(&tag)
            .map(|decoder| decoder.as_ref())
            .ok_or_else(|| ExtractError::UnsupportedFormat {
                tag: tag.to_string(),
            })
    }
}
