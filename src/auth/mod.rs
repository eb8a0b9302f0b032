//! Authentication

mod errors;
pub mod google;
mod models;
pub mod otp;
pub mod password;
mod repository;
mod service;
mod token;

pub use errors::*;
pub use google::{GoogleTokenInfoClient, GoogleTokenVerifier, GoogleVerifierConfig};
pub use models::*;
pub use otp::{OtpSender, SmsGatewayClient, SmsGatewayConfig};
pub use service::*;
pub use token::*;
