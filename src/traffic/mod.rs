pub mod classifier;

pub use classifier::{FlowClassifier, ClassificationReport, PortProtocolCounts, TagCounts};
