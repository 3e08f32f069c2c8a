pub mod capture;
pub mod collaborators;
pub mod config;
pub mod drawing;
pub mod error;
pub mod model;
pub mod recognition;
pub mod services;
pub mod spread;
pub mod vision;

#[cfg(test)]
mod test_utils;
