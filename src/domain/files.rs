use serde::{Deserialize, Serialize};

/// Descriptor returned by file storage. The only thing the desk keeps about a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub mimetype: String,
}

/// Raw upload that still has to go through storage.
#[derive(Clone, PartialEq)]
pub struct FileUpload {
    pub filename: String,
    pub mimetype: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("filename", &self.filename)
            .field("mimetype", &self.mimetype)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A file handed to the desk: either already stored (hosted URL) or a raw upload.
#[derive(Debug, Clone, PartialEq)]
pub enum FileInput {
    Stored(StoredFile),
    Upload(FileUpload),
}
