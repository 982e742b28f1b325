pub mod pagination;
pub mod time;

pub use pagination::{Page, PageParams};
pub use time::{new_id, now_rfc3339, today};
