use crc32fast::Hasher;

/// Stable seed for a document: CRC32 of its identifier
pub fn get_document_seed(document_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(document_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential element id generator for content inserted into a document
#[derive(Debug, Clone)]
pub struct IDGenerator {
    prefix: String,
    seed: String, // Document seed (CRC32)
    count: u32,   // Sequential counter
}

impl IDGenerator {
    pub fn new(prefix: impl Into<String>, document_id: &str) -> Self {
        Self {
            prefix: prefix.into(),
            seed: get_document_seed(document_id),
            count: 0,
        }
    }

    pub fn from_seed(prefix: impl Into<String>, seed: String) -> Self {
        Self {
            prefix: prefix.into(),
            seed,
            count: 0,
        }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}-{}", self.prefix, self.seed, self.count)
    }

    /// Generate the next ID for which `taken` is false.
    ///
    /// Content saved by an earlier session already carries ids from this
    /// sequence; skipping them keeps every id unique within the document.
    pub fn next_unused(&mut self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = self.new_id();
            if !taken(&id) {
                return id;
            }
        }
    }

    /// Get document seed
    pub fn seed(&self) -> &str {
        &self.seed
    }
}
