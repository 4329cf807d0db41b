mod codec_decoder;

pub use codec_decoder::*;
