//! Training data: records, sources, corpus preparation, and splitting.

pub mod corpus;
pub mod record;
pub mod source;
pub mod split;

pub use corpus::{Corpus, CorpusStats};
pub use record::{Label, RawRecord};
pub use source::{CsvDataSource, DataSource, JsonlDataSource, VecDataSource, open_data_source};
pub use split::{SplitConfig, SplitIndices, stratified_split};
