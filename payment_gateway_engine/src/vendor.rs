//! The outbound vendor REST client.
//!
//! Every vendor endpoint takes a MAC-signed `application/x-www-form-urlencoded` POST. Responses
//! come back either as form-encoded key/value pairs (trade queries, actions, member binding) or
//! as JSON (the credit-card authorization detail endpoint).
//!
//! The [`VendorApi`] trait is the seam the gateway is generic over, so tests can drive the
//! refund and reconciliation flows against a mock without a network.

use std::{collections::BTreeMap, fmt::Display, str::FromStr, sync::Arc, time::Duration};

use log::*;
use pgw_common::Money;
use reqwest::Client;
use serde::Deserialize;

use crate::errors::VendorApiError;

//-----------------------------------   CreditAuthStatus   -----------------------------------------------------------

/// The remote status of a credit card authorization, reported by the vendor's detail query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditAuthStatus {
    /// Captured and closed; a refund must reverse the capture (`"R"`).
    Closed,
    /// Authorized but not yet captured; a refund voids the authorization (`"N"`).
    Authorized,
    Unauthorized,
    Cancelled,
    ManuallyCancelled,
}

impl Display for CreditAuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreditAuthStatus::Closed => write!(f, "Closed"),
            CreditAuthStatus::Authorized => write!(f, "Authorized"),
            CreditAuthStatus::Unauthorized => write!(f, "Unauthorized"),
            CreditAuthStatus::Cancelled => write!(f, "Cancelled"),
            CreditAuthStatus::ManuallyCancelled => write!(f, "ManuallyCancelled"),
        }
    }
}

impl FromStr for CreditAuthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Closed" => Ok(Self::Closed),
            "Authorized" => Ok(Self::Authorized),
            "Unauthorized" => Ok(Self::Unauthorized),
            "Cancelled" => Ok(Self::Cancelled),
            "ManuallyCancelled" => Ok(Self::ManuallyCancelled),
            s => Err(format!("Unknown credit authorization status: {s}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreditTradeInfo {
    pub status: CreditAuthStatus,
    pub amount: Money,
}

/// The vendor's reply to a capture-reversal or void action.
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub rtn_code: i64,
    pub rtn_msg: String,
    pub merchant_trade_no: String,
    pub trade_no: String,
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        self.rtn_code == 1
    }
}

//--------------------------------------    VendorApi    -------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait VendorApi: Send + Sync {
    /// `QueryTradeInfo`: the raw field map of the vendor's reconciliation answer, MAC included.
    async fn query_trade_info(
        &self,
        fields: Vec<(String, String)>,
    ) -> Result<BTreeMap<String, String>, VendorApiError>;

    /// Credit-card authorization detail lookup.
    async fn query_credit_trade(&self, fields: Vec<(String, String)>) -> Result<CreditTradeInfo, VendorApiError>;

    /// Issue a capture-reversal or void action against a committed credit card trade.
    async fn do_action(&self, fields: Vec<(String, String)>) -> Result<ActionResult, VendorApiError>;

    /// Look up the card bound to a member, as a raw field map.
    async fn query_member_binding(
        &self,
        fields: Vec<(String, String)>,
    ) -> Result<BTreeMap<String, String>, VendorApiError>;
}

//--------------------------------------  RestVendorApi  -------------------------------------------------------------

const QUERY_TRADE_PATH: &str = "/Cashier/QueryTradeInfo/V5";
const CREDIT_TRADE_PATH: &str = "/CreditDetail/QueryTrade/V2";
const DO_ACTION_PATH: &str = "/CreditDetail/DoAction";
const MEMBER_BINDING_PATH: &str = "/MerchantMember/QueryMemberBinding";

#[derive(Clone)]
pub struct RestVendorApi {
    base_url: String,
    client: Arc<Client>,
}

impl RestVendorApi {
    pub fn new(base_url: &str) -> Result<Self, VendorApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VendorApiError::Initialization(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_form(&self, path: &str, fields: &[(String, String)]) -> Result<String, VendorApiError> {
        let url = self.url(path);
        trace!("Posting signed form to {url}");
        let response = self
            .client
            .post(&url)
            .form(fields)
            .send()
            .await
            .map_err(|e| VendorApiError::RequestError(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| VendorApiError::RequestError(e.to_string()))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(VendorApiError::QueryError { status: status.as_u16(), message: body })
        }
    }

    fn decode_pairs(body: &str) -> Result<BTreeMap<String, String>, VendorApiError> {
        serde_urlencoded::from_str(body).map_err(|e| VendorApiError::ResponseFormat(e.to_string()))
    }
}

#[derive(Deserialize)]
struct CreditTradeResponse {
    #[serde(rename = "RtnMsg", default)]
    rtn_msg: String,
    #[serde(rename = "RtnValue")]
    value: CreditTradeValue,
}

#[derive(Deserialize)]
struct CreditTradeValue {
    status: String,
    #[serde(default)]
    amount: String,
}

impl VendorApi for RestVendorApi {
    async fn query_trade_info(
        &self,
        fields: Vec<(String, String)>,
    ) -> Result<BTreeMap<String, String>, VendorApiError> {
        let body = self.post_form(QUERY_TRADE_PATH, &fields).await?;
        Self::decode_pairs(&body)
    }

    async fn query_credit_trade(&self, fields: Vec<(String, String)>) -> Result<CreditTradeInfo, VendorApiError> {
        let body = self.post_form(CREDIT_TRADE_PATH, &fields).await?;
        let response =
            serde_json::from_str::<CreditTradeResponse>(&body).map_err(|e| VendorApiError::ResponseFormat(e.to_string()))?;
        debug!("Credit trade query answered: {}", response.rtn_msg);
        let status = response
            .value
            .status
            .parse::<CreditAuthStatus>()
            .map_err(VendorApiError::ResponseFormat)?;
        let amount = response.value.amount.parse::<i64>().unwrap_or_default();
        Ok(CreditTradeInfo { status, amount: Money::from(amount) })
    }

    async fn do_action(&self, fields: Vec<(String, String)>) -> Result<ActionResult, VendorApiError> {
        let body = self.post_form(DO_ACTION_PATH, &fields).await?;
        let pairs = Self::decode_pairs(&body)?;
        let rtn_code = pairs
            .get("RtnCode")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| VendorApiError::ResponseFormat("missing or non-numeric RtnCode".into()))?;
        Ok(ActionResult {
            rtn_code,
            rtn_msg: pairs.get("RtnMsg").cloned().unwrap_or_default(),
            merchant_trade_no: pairs.get("MerchantTradeNo").cloned().unwrap_or_default(),
            trade_no: pairs.get("TradeNo").cloned().unwrap_or_default(),
        })
    }

    async fn query_member_binding(
        &self,
        fields: Vec<(String, String)>,
    ) -> Result<BTreeMap<String, String>, VendorApiError> {
        let body = self.post_form(MEMBER_BINDING_PATH, &fields).await?;
        Self::decode_pairs(&body)
    }
}
