pub mod error;
pub mod id;
pub mod node;
pub mod scope;
pub mod table;

// Re-export commonly used types
pub use error::CoreError;
pub use id::NodeId;
pub use node::{Node, NodeKind, NodeType, Slot};
pub use table::NodeTable;
