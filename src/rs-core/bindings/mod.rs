mod api;
mod event_listeners;
mod js_functions;
mod js_host;

pub use event_listeners::ChunkPlayer;
pub use js_functions::*;
pub use js_host::{JsChannelSink, JsPlaybackSurface, JsSegmentSource};
