pub mod comment;
pub mod comment_like;
pub mod competition;
pub mod competition_participant;
pub mod content;
pub mod content_like;
pub mod content_view;
pub mod enums;
pub mod user;
