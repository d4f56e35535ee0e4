//! HTTP client for the hosted payment gateway function.

use async_trait::async_trait;

use crate::gateway::{GatewayError, GatewayRequest, GatewayResponse, PaymentGateway};

/// Invokes the hosted gateway function over HTTP.
///
/// The function answers 400 for validation problems and 500 for upstream
/// failures; both surface as [`GatewayError::Upstream`] with the body's
/// error message when one is present.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGateway {
    /// Creates a gateway client for the given function endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_session(
        &self,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value =
                response.json().await.unwrap_or(serde_json::Value::Null);
            let message = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("gateway request rejected")
                .to_string();
            tracing::warn!(status = status.as_u16(), %message, "gateway rejected request");
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<GatewayResponse>()
            .await
            .map_err(|e| GatewayError::Transport(format!("invalid response body: {e}")))
    }
}
