pub mod add;
pub mod delete;
pub mod done;
pub mod edit;
pub mod filter;
pub mod list;
pub mod show;
