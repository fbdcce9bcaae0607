use std::{fs, io::Write, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("Asset file access failed")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode asset")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("Failed to decode asset")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("{0} unread bytes after decoding asset")]
    TrailingBytes(usize),
}

/// Binary persistence through bincode's standard configuration.
pub trait Asset: Sized + bincode::Encode + bincode::Decode<()> {
    fn to_bytes(&self) -> Result<Vec<u8>, AssetError> {
        Ok(bincode::encode_to_vec(self, bincode::config::standard())?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let (asset, read) = bincode::decode_from_slice(bytes, bincode::config::standard())?;

        if read != bytes.len() {
            return Err(AssetError::TrailingBytes(bytes.len() - read));
        }

        Ok(asset)
    }

    fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let data = self.to_bytes()?;

        let mut file = fs::File::create(path)?;
        file.write_all(&data[..])?;

        Ok(())
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let data = fs::read(path)?;

        Self::from_bytes(&data)
    }
}
