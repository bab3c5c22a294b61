//! # mjview: MJPEG camera viewer
//!
//! Runs on a small device with an RGB565 framebuffer. Pulls the MJPEG
//! stream from a phone or IP camera, shows only the newest frame, and
//! takes rotate/swap/torch/reconnect commands from stdin.

pub mod config;
pub mod display;
pub mod input;
pub mod status;
