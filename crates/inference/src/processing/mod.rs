pub mod post;

pub use post::PostProcessor;
