// src/engine/response.rs
//
// Wire shape of the process-image endpoint.
//
// Success: { success: true, originalImage, encryptedImage, decryptedImage,
//            metrics: { originalEntropy, encryptedEntropy, decryptedEntropy,
//                       encryptedPSNR, decryptedPSNR, pixelDistribution } }
// Failure: { success: false, message }

use crate::error::{EndcryptError, ErrorCategory};
use crate::metrics::{Distribution, ImageMetrics};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

/// Two-decimal rounding; non-finite values become `None` (`null` in JSON).
pub fn round_metric(value: f64) -> Option<f64> {
    value.is_finite().then(|| (value * 100.0).round() / 100.0)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcessSuccess {
    /// Data URLs (`data:image/png;base64,...`).
    pub original_image: String,
    pub encrypted_image: String,
    pub decrypted_image: String,
    pub metrics: ImageMetrics,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProcessResponse {
    Success(Box<ProcessSuccess>),
    Failure {
        message: String,
        category: ErrorCategory,
    },
}

impl ProcessResponse {
    pub fn failure(err: &EndcryptError) -> Self {
        ProcessResponse::Failure {
            message: err.to_string(),
            category: err.category(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResponse::Success(_))
    }

    /// Suggested HTTP status. Hosts that always answer 200 may ignore it.
    pub fn http_status(&self) -> u16 {
        match self {
            ProcessResponse::Success(_) => 200,
            ProcessResponse::Failure { category, .. } => category.http_status(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<EndcryptError> for ProcessResponse {
    fn from(err: EndcryptError) -> Self {
        ProcessResponse::failure(&err)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsWire {
    original_entropy: Option<f64>,
    encrypted_entropy: Option<f64>,
    decrypted_entropy: Option<f64>,
    #[serde(rename = "encryptedPSNR")]
    encrypted_psnr: Option<f64>,
    #[serde(rename = "decryptedPSNR")]
    decrypted_psnr: Option<f64>,
    pixel_distribution: Distribution,
}

impl From<&ImageMetrics> for MetricsWire {
    fn from(m: &ImageMetrics) -> Self {
        Self {
            original_entropy: round_metric(m.original_entropy),
            encrypted_entropy: round_metric(m.encrypted_entropy),
            decrypted_entropy: round_metric(m.decrypted_entropy),
            encrypted_psnr: round_metric(m.encrypted_psnr),
            decrypted_psnr: round_metric(m.decrypted_psnr),
            pixel_distribution: m.distribution,
        }
    }
}

impl Serialize for ProcessResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProcessResponse::Success(body) => {
                let mut s = serializer.serialize_struct("ProcessResponse", 5)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("originalImage", &body.original_image)?;
                s.serialize_field("encryptedImage", &body.encrypted_image)?;
                s.serialize_field("decryptedImage", &body.decrypted_image)?;
                s.serialize_field("metrics", &MetricsWire::from(&body.metrics))?;
                s.end()
            }
            ProcessResponse::Failure { message, .. } => {
                let mut s = serializer.serialize_struct("ProcessResponse", 2)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("message", message)?;
                s.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn metrics() -> ImageMetrics {
        ImageMetrics {
            original_entropy: 3.14159,
            encrypted_entropy: 7.99712,
            decrypted_entropy: 3.14159,
            encrypted_psnr: 8.4049,
            decrypted_psnr: f64::INFINITY,
            distribution: Distribution { low: 1, mid: 2, high: 3 },
        }
    }

    #[test]
    fn rounding_and_infinity() {
        assert_eq!(round_metric(7.996), Some(8.0));
        assert_eq!(round_metric(8.404_9), Some(8.4));
        assert_eq!(round_metric(f64::INFINITY), None);
        assert_eq!(round_metric(f64::NAN), None);
    }

    #[test]
    fn success_json_shape() {
        let resp = ProcessResponse::Success(Box::new(ProcessSuccess {
            original_image: "data:image/png;base64,AA==".into(),
            encrypted_image: "data:image/png;base64,AQ==".into(),
            decrypted_image: "data:image/png;base64,AA==".into(),
            metrics: metrics(),
        }));
        let value: Value = serde_json::from_str(&resp.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "originalImage": "data:image/png;base64,AA==",
                "encryptedImage": "data:image/png;base64,AQ==",
                "decryptedImage": "data:image/png;base64,AA==",
                "metrics": {
                    "originalEntropy": 3.14,
                    "encryptedEntropy": 8.0,
                    "decryptedEntropy": 3.14,
                    "encryptedPSNR": 8.4,
                    "decryptedPSNR": null,
                    "pixelDistribution": { "low": 1, "mid": 2, "high": 3 }
                }
            })
        );
        assert_eq!(resp.http_status(), 200);
    }

    #[test]
    fn failure_json_shape() {
        let resp = ProcessResponse::from(EndcryptError::invalid_key("Key must not be empty"));
        let value: Value = serde_json::from_str(&resp.to_json().unwrap()).unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value["message"].as_str().unwrap().contains("Key must not be empty"));
        assert_eq!(value.as_object().unwrap().len(), 2);
        assert_eq!(resp.http_status(), 400);
        assert!(!resp.is_success());
    }

    #[test]
    fn internal_failures_map_to_500() {
        let resp = ProcessResponse::from(EndcryptError::internal_panic("boom"));
        assert_eq!(resp.http_status(), 500);
    }
}
