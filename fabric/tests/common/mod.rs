#![allow(dead_code)]

pub mod mock_platform;

pub use mock_platform::*;
