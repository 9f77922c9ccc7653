pub mod channels;
pub mod emotes;
pub mod health;
pub mod ws;
