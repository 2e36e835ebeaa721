//! Sensor Platform API
//!
//! Client side of the platform's REST API.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /auth/login` - Exchange credentials for a token
//! - `GET /auth/verify` - Check the stored token
//! - `GET /auth/profile` - Profile of the token's user
//!
//! ## Sensors
//! - `GET /sensors/types` - Known sensor families
//! - `GET /sensors/summary` - Record counts per sensor
//! - `GET /sensors/{type}/latest?limit=N` - Latest readings, newest first
//! - `GET /sensors/{type}/statistics?hours=N` - Server-side aggregates
//!
//! ## Predictions
//! - `POST /predictions/{type}/predict` - Generate a forecast
//! - `GET /predictions/{type}/latest` - Last stored forecast
//! - `POST /predictions/{type}/train` - Train one sensor's models (admin)
//! - `POST /predictions/train/all` - Train every sensor's models (admin)

pub mod client;
pub mod dto;
pub mod error;

pub use client::{ApiClient, ApiResponse};
pub use dto::*;
pub use error::{ApiError, ApiResult};
