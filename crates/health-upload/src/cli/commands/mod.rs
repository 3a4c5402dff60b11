pub mod index;
pub mod notifications;
pub mod upload;
pub mod visibility;

pub use index::show as show_index;
pub use notifications::received as notify_received;
pub use upload::run as upload;
pub use visibility::{hide, hide_range, recent};
