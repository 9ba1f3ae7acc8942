use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use payment_gateway_engine::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Gateway(e) => match e {
                GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
                GatewayError::OrderNotFound(_) | GatewayError::NoCardFound(_) => StatusCode::NOT_FOUND,
                GatewayError::Store(_) |
                GatewayError::Order(_) |
                GatewayError::RefundNotAvailable(_) |
                GatewayError::RemoteState(_) => StatusCode::CONFLICT,
                GatewayError::ActionRejected { .. } |
                GatewayError::RemoteChecksumInvalid |
                GatewayError::MissingField(_) |
                GatewayError::UnrecognizedField { .. } |
                GatewayError::VendorApi(_) => StatusCode::BAD_GATEWAY,
            },
            Self::InitializeError(_) | Self::ConfigurationError(_) | Self::IOError(_) | Self::Unspecified(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}
