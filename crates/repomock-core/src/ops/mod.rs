pub mod item_map;
pub mod node_ops;
pub mod store;

pub use item_map::ItemMap;
pub use store::{ItemStore, SharedItems};
