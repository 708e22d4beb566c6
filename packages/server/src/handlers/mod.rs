pub mod comment;
pub mod competition;
pub mod content;
pub mod health;
