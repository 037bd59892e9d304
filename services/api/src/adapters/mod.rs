pub mod gemini;

pub use gemini::GeminiQaAdapter;
