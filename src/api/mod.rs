pub mod feed;
pub mod presence;
