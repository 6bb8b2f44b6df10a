use crc32fast::Hasher;

/// Derive a document seed from a name using CRC32
pub fn document_seed(name: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential node ids for one document
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new(name: &str) -> Self {
        Self::from_seed(document_seed(name))
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential id
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new("folio")
    }
}
