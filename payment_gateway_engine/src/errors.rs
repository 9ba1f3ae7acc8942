use std::fmt::Display;

use pgw_common::Money;
use thiserror::Error;

use crate::{
    channels::{PaymentChannel, PeriodUnit},
    order::OrderState,
    vendor::CreditAuthStatus,
};

/// Synchronous prepare-time validation failures. These are raised before any network or store
/// interaction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("An order must contain at least one line item")]
    EmptyOrder,
    #[error("Total amount {amount} is outside the {channel} bounds of {min}..={max}")]
    AmountOutOfBounds { channel: PaymentChannel, amount: Money, min: i64, max: i64 },
    #[error("The {option} option is not available on the {channel} channel")]
    OptionNotSupported { option: &'static str, channel: PaymentChannel },
    #[error("Installment payments cannot be combined with {0}")]
    InstallmentConflict(&'static str),
    #[error("Recurring {field} of {value} is out of bounds for the {unit} period unit")]
    RecurringOutOfBounds { field: &'static str, value: u32, unit: PeriodUnit },
    #[error("Expiry window of {value} is out of bounds for the {channel} channel")]
    ExpiryWindowOutOfBounds { value: u32, channel: PaymentChannel },
}

/// State machine violations on an [`crate::order::Order`] or [`crate::bind_request::BindRequest`].
#[derive(Debug, Clone, Error)]
pub enum OrderError {
    #[error("Operation is not permitted from the {0} state")]
    InvalidState(OrderState),
    #[error("Settlement fields do not match the stored order: {0}")]
    SettlementMismatch(String),
    #[error("The binding form has already been materialized")]
    FormAlreadyMaterialized,
    #[error("The callback channel {0} does not match the order's channel")]
    ChannelMismatch(PaymentChannel),
    #[error("The binding request is not awaiting a callback")]
    BindingNotPending,
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("An entry with id {0} is already pending")]
    DuplicateId(String),
}

/// Failures talking to the vendor REST API.
#[derive(Debug, Error)]
pub enum VendorApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the vendor API: {0}")]
    RequestError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not decode the vendor response: {0}")]
    ResponseFormat(String),
}

/// Errors surfaced to callers of the gateway's prepare/query/refund/bind operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Order validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("Order {0} was not found")]
    OrderNotFound(String),
    #[error("Order state error: {0}")]
    Order(#[from] OrderError),
    #[error("Refund is not available: {0}")]
    RefundNotAvailable(String),
    #[error("The vendor reports the authorization as {0}; no refund action can be issued")]
    RemoteState(CreditAuthStatus),
    #[error("The vendor rejected the {action} action. Error {code}. {message}")]
    ActionRejected { action: &'static str, code: i64, message: String },
    #[error("The vendor response failed MAC verification")]
    RemoteChecksumInvalid,
    #[error("The vendor response is missing the {0} field")]
    MissingField(&'static str),
    #[error("Unrecognized value {value} in the vendor's {field} field")]
    UnrecognizedField { field: &'static str, value: String },
    #[error("No bound card found for member {0}")]
    NoCardFound(String),
    #[error("Vendor API error: {0}")]
    VendorApi(#[from] VendorApiError),
}

/// The closed set of reasons a webhook can be rejected with. These render into the two-part
/// plaintext status line the vendor expects (`0|CheckSumInvalid`, `0|OrderNotFound`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackRejection {
    CheckSumInvalid,
    OrderNotFound,
}

impl Display for CallbackRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackRejection::CheckSumInvalid => write!(f, "CheckSumInvalid"),
            CallbackRejection::OrderNotFound => write!(f, "OrderNotFound"),
        }
    }
}
