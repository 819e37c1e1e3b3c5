pub mod ai;
pub mod broadcast;
pub mod catalog;
pub mod conversation;
pub mod messaging;
pub mod navigator;
pub mod sessions;
