pub mod db;

pub use db::{runtime_path, HerodexDb};
