use std::collections::BTreeMap;

use mockall::mock;
use payment_gateway_engine::{
    errors::VendorApiError,
    vendor::{ActionResult, CreditTradeInfo, VendorApi},
};

mock! {
    pub Vendor {}
    impl VendorApi for Vendor {
        async fn query_trade_info(&self, fields: Vec<(String, String)>) -> Result<BTreeMap<String, String>, VendorApiError>;
        async fn query_credit_trade(&self, fields: Vec<(String, String)>) -> Result<CreditTradeInfo, VendorApiError>;
        async fn do_action(&self, fields: Vec<(String, String)>) -> Result<ActionResult, VendorApiError>;
        async fn query_member_binding(&self, fields: Vec<(String, String)>) -> Result<BTreeMap<String, String>, VendorApiError>;
    }
}
