pub mod spectrum_bars;
pub mod status;
