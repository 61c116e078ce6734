pub mod wav;

pub use wav::WavSource;
