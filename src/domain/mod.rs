pub mod pagination;
pub mod post;
pub mod user;

pub use pagination::{PageMeta, PageQuery};
