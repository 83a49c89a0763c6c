pub mod wire_codec_test;
