pub mod controller;
pub mod export;
pub mod integration;
pub mod regions;
