pub mod protocols;
pub mod lookup;

pub use protocols::{ProtocolType, protocol_name};
pub use lookup::{LookupKey, ReferenceTable, UNKNOWN_TAG, UNTAGGED};
