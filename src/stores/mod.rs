pub mod category;
pub mod contact;
pub mod job;
pub mod template;
