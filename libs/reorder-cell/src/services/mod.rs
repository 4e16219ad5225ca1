pub mod dose;
pub mod lifecycle;
pub mod reorder;

pub use reorder::ReorderService;
