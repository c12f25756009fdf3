//! Integration tests for the configuration loader and the control endpoint

mod config_loading;
mod controller_api;
