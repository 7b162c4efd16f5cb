mod cue_parser;

pub use cue_parser::{parse_cues, Cue};
