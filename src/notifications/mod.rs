pub mod alert;
pub mod channel;
pub mod email;
pub mod error;
pub mod phone;
pub mod sms;
pub mod whatsapp;
