pub mod cluster;
pub mod materialize;
pub mod reader;
pub mod writer;

pub use cluster::{detect_clusters, Cluster};
pub use materialize::materialize_document;
pub use reader::{PageRect, PageRecord, PdfReader, RasterImage, VectorDrawItem};
pub use writer::{write_tagged_pdf, AltTextMap};
