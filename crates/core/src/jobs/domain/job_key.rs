use std::fmt;

/// Identifies at most one concurrently running transcription job:
/// one item (audio file) inside one collection (book).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    pub collection: String,
    pub item: String,
}

impl JobKey {
    pub fn new(collection: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            item: item.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.item)
    }
}
