// Library exports for gitlab-depcheck
pub mod cli;
pub mod config;
pub mod gitlab;
pub mod manifest;
pub mod output;
pub mod report;
pub mod retry;
pub mod runner;
pub mod scan;
