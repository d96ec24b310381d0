//! Conversions from external infrastructure errors into domain errors.

use carelink_domain::CareLinkError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CareLinkError);

impl From<InfraError> for CareLinkError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CareLinkError> for InfraError {
    fn from(value: CareLinkError) -> Self {
        Self(value)
    }
}

trait IntoCareLinkError {
    fn into_carelink(self) -> CareLinkError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CareLinkError */
/* -------------------------------------------------------------------------- */

impl IntoCareLinkError for HttpError {
    fn into_carelink(self) -> CareLinkError {
        if self.is_timeout() {
            return CareLinkError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CareLinkError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return CareLinkError::InvalidInput(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let message = format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            );
            return if status.is_client_error() {
                CareLinkError::InvalidInput(message)
            } else {
                CareLinkError::Network(message)
            };
        }

        CareLinkError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_carelink())
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn http_status_404_maps_to_invalid_input() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::NOT_FOUND))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: CareLinkError = InfraError::from(error).into();
        match mapped {
            CareLinkError::InvalidInput(msg) => assert!(msg.contains("404")),
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_refused_maps_to_network() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: CareLinkError = InfraError::from(error).into();
        assert!(matches!(mapped, CareLinkError::Network(_)));
    }
}
