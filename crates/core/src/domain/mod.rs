pub mod chunk;
pub mod contact;
pub mod draft;
