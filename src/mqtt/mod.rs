//! L4: MQTT 5 control packet codec, layered directly on top of
//! `WsClient::to_mqtt_buf` / `WsClient::queue_binary`.

pub mod alias;
pub mod arena;
pub mod codec;
pub mod properties;
pub mod vbi;

pub use codec::{MqttCodec, MqttConnState, MqttEvent};
