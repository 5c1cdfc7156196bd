// Economic timeline service: tile catalogue, data normalization and canvas state
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
