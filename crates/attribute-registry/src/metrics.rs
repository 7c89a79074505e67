use crate::decode::decode;
use crate::encode::encode;
use crate::error::Result;
use crate::types::AttributeDescriptor;
use crate::value::Value;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct CodecMetrics {
    pub values_decoded: IntCounter,
    pub values_encoded: IntCounter,
    pub codec_errors: IntCounter,
    pub profiles_loaded: IntGauge,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub codec: CodecMetrics,
}

impl MetricsHub {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let values_decoded = IntCounter::new("af_values_decoded", "Attribute values decoded")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let values_encoded = IntCounter::new("af_values_encoded", "Attribute values encoded")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let codec_errors =
            IntCounter::new("af_codec_errors", "Lookup, decode and encode failures")
                .map_err(|e| format!("metrics init error: {e}"))?;
        let profiles_loaded = IntGauge::new("af_profiles_loaded", "Number of profiles loaded")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let codec = CodecMetrics {
            values_decoded,
            values_encoded,
            codec_errors,
            profiles_loaded,
        };
        let _ = registry.register(Box::new(codec.values_decoded.clone()));
        let _ = registry.register(Box::new(codec.values_encoded.clone()));
        let _ = registry.register(Box::new(codec.codec_errors.clone()));
        let _ = registry.register(Box::new(codec.profiles_loaded.clone()));
        Ok(Self { registry, codec })
    }

    /// [`decode`] that records the outcome.
    pub fn decode(&self, desc: &AttributeDescriptor, data: &[u8]) -> Result<Value> {
        let out = decode(desc, data);
        match out {
            Ok(_) => self.codec.values_decoded.inc(),
            Err(_) => self.codec.codec_errors.inc(),
        }
        out
    }

    /// [`encode`] that records the outcome.
    pub fn encode(&self, desc: &AttributeDescriptor, value: &Value) -> Result<Vec<u8>> {
        let out = encode(desc, value);
        match out {
            Ok(_) => self.codec.values_encoded.inc(),
            Err(_) => self.codec.codec_errors.inc(),
        }
        out
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
