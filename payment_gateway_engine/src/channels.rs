//! Per-channel validation, outbound field mapping, and callback parsing.
//!
//! Each settlement channel carries its own amount bounds, expiry-window semantics and exclusive
//! options, and each declares which callback fields it reads and how they are typed. Numeric
//! coercion therefore happens here, per channel, rather than through a global whitelist.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use pgw_common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{errors::ValidationError, order::AdditionalInfo};

/// Settlement success return code, shared by all channels.
pub const SETTLEMENT_SUCCESS_CODE: i64 = 1;
const ATM_INFO_SUCCESS_CODE: i64 = 2;
const CVS_INFO_SUCCESS_CODE: i64 = 10_100_073;

//--------------------------------------   PaymentChannel    ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentChannel {
    CreditCard,
    VirtualAccount,
    CvsKiosk,
    CvsBarcode,
    WebAtm,
    ApplePay,
}

impl PaymentChannel {
    /// The `ChoosePayment` token for this channel.
    pub fn wire_token(&self) -> &'static str {
        match self {
            PaymentChannel::CreditCard => "Credit",
            PaymentChannel::VirtualAccount => "ATM",
            PaymentChannel::CvsKiosk => "CVS",
            PaymentChannel::CvsBarcode => "BARCODE",
            PaymentChannel::WebAtm => "WebATM",
            PaymentChannel::ApplePay => "ApplePay",
        }
    }

    /// Resolve a callback's `PaymentType` field (e.g. `ATM_LAND`, `Credit_CreditCard`) to a
    /// channel by matching the prefix before the underscore.
    pub fn from_payment_type(payment_type: &str) -> Option<Self> {
        let prefix = payment_type.split('_').next().unwrap_or(payment_type);
        prefix.parse().ok()
    }

    /// Channels where the vendor first returns account/code details and settles later.
    pub fn two_phase(&self) -> bool {
        matches!(self, PaymentChannel::VirtualAccount | PaymentChannel::CvsKiosk | PaymentChannel::CvsBarcode)
    }

    /// Inclusive total-amount bounds. `None` means the vendor documents no upper bound.
    pub fn amount_bounds(&self) -> (i64, Option<i64>) {
        match self {
            PaymentChannel::CreditCard => (5, Some(199_999)),
            PaymentChannel::VirtualAccount => (11, Some(49_999)),
            PaymentChannel::CvsKiosk => (33, Some(6_000)),
            PaymentChannel::CvsBarcode => (17, Some(20_000)),
            PaymentChannel::WebAtm => (1, None),
            PaymentChannel::ApplePay => (1, None),
        }
    }

    /// The success return code of this channel's info-retrieval callback.
    pub fn info_success_code(&self) -> Option<i64> {
        match self {
            PaymentChannel::VirtualAccount => Some(ATM_INFO_SUCCESS_CODE),
            PaymentChannel::CvsKiosk | PaymentChannel::CvsBarcode => Some(CVS_INFO_SUCCESS_CODE),
            _ => None,
        }
    }
}

impl Display for PaymentChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_token())
    }
}

impl FromStr for PaymentChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Credit" => Ok(Self::CreditCard),
            "ATM" => Ok(Self::VirtualAccount),
            "CVS" => Ok(Self::CvsKiosk),
            "BARCODE" => Ok(Self::CvsBarcode),
            "WebATM" => Ok(Self::WebAtm),
            "ApplePay" => Ok(Self::ApplePay),
            s => Err(format!("Unknown payment channel: {s}")),
        }
    }
}

//--------------------------------------   ChannelOptions    ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodUnit {
    Day,
    Month,
    Year,
}

impl PeriodUnit {
    pub fn wire_token(&self) -> &'static str {
        match self {
            PeriodUnit::Day => "D",
            PeriodUnit::Month => "M",
            PeriodUnit::Year => "Y",
        }
    }

    // (max frequency, max times) per unit.
    fn recurring_bounds(&self) -> (u32, u32) {
        match self {
            PeriodUnit::Day => (365, 999),
            PeriodUnit::Month => (12, 99),
            PeriodUnit::Year => (1, 9),
        }
    }
}

impl Display for PeriodUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_token())
    }
}

/// A recurring credit card charge schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurring {
    pub period_unit: PeriodUnit,
    pub frequency: u32,
    pub times: u32,
    pub amount: Money,
}

/// Channel-exclusive checkout options, mutually validated against the chosen channel before
/// anything leaves the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOptions {
    /// Credit card only. Allowed installment counts, rendered as e.g. `3,6,12`.
    pub installments: Option<Vec<u32>>,
    /// Credit card only. Pay with bonus points.
    pub redeem: bool,
    /// Credit card only.
    pub union_pay: bool,
    /// Credit card only. Ask the vendor to remember the card for binding.
    pub remember_card: bool,
    /// Credit card only. Mutually exclusive with installments.
    pub recurring: Option<Recurring>,
    /// Two-phase channels only. Days for ATM/barcode, minutes for the CVS kiosk.
    pub expire_window: Option<u32>,
}

/// Validate amount bounds and option combinations for a prepare call. Synchronous; runs before
/// any network or store interaction.
pub fn validate(channel: PaymentChannel, total: Money, options: &ChannelOptions) -> Result<(), ValidationError> {
    let (min, max) = channel.amount_bounds();
    let upper = max.unwrap_or(i64::MAX);
    if total.value() < min || total.value() > upper {
        return Err(ValidationError::AmountOutOfBounds { channel, amount: total, min, max: upper });
    }
    if channel != PaymentChannel::CreditCard {
        for (set, option) in [
            (options.installments.is_some(), "installments"),
            (options.redeem, "redeem"),
            (options.union_pay, "union_pay"),
            (options.remember_card, "remember_card"),
            (options.recurring.is_some(), "recurring"),
        ] {
            if set {
                return Err(ValidationError::OptionNotSupported { option, channel });
            }
        }
    }
    if options.installments.is_some() {
        if options.redeem {
            return Err(ValidationError::InstallmentConflict("redeem"));
        }
        if options.recurring.is_some() {
            return Err(ValidationError::InstallmentConflict("recurring"));
        }
    }
    if let Some(recurring) = &options.recurring {
        let unit = recurring.period_unit;
        let (max_frequency, max_times) = unit.recurring_bounds();
        if recurring.frequency < 1 || recurring.frequency > max_frequency {
            return Err(ValidationError::RecurringOutOfBounds { field: "frequency", value: recurring.frequency, unit });
        }
        if recurring.times < 1 || recurring.times > max_times {
            return Err(ValidationError::RecurringOutOfBounds { field: "times", value: recurring.times, unit });
        }
    }
    if let Some(window) = options.expire_window {
        let bounds = match channel {
            PaymentChannel::VirtualAccount => Some(1..=60u32),
            PaymentChannel::CvsKiosk => Some(1..=43_200u32),
            PaymentChannel::CvsBarcode => Some(1..=30u32),
            _ => None,
        };
        match bounds {
            None => return Err(ValidationError::OptionNotSupported { option: "expire_window", channel }),
            Some(range) if !range.contains(&window) => {
                return Err(ValidationError::ExpiryWindowOutOfBounds { value: window, channel })
            },
            Some(_) => {},
        }
    }
    Ok(())
}

/// The channel-specific fields of the outbound checkout form.
pub fn outbound_fields(channel: PaymentChannel, options: &ChannelOptions) -> Vec<(String, String)> {
    let mut fields = vec![("ChoosePayment".to_string(), channel.wire_token().to_string())];
    match channel {
        PaymentChannel::CreditCard => {
            if let Some(installments) = &options.installments {
                let list = installments.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
                fields.push(("CreditInstallment".into(), list));
            }
            if options.redeem {
                fields.push(("Redeem".into(), "Y".into()));
            }
            if options.union_pay {
                fields.push(("UnionPay".into(), "1".into()));
            }
            if options.remember_card {
                fields.push(("BindingCard".into(), "1".into()));
            }
            if let Some(recurring) = &options.recurring {
                fields.push(("PeriodAmount".into(), recurring.amount.value().to_string()));
                fields.push(("PeriodType".into(), recurring.period_unit.wire_token().into()));
                fields.push(("Frequency".into(), recurring.frequency.to_string()));
                fields.push(("ExecTimes".into(), recurring.times.to_string()));
            }
        },
        PaymentChannel::VirtualAccount => {
            if let Some(days) = options.expire_window {
                fields.push(("ExpireDate".into(), days.to_string()));
            }
        },
        PaymentChannel::CvsKiosk | PaymentChannel::CvsBarcode => {
            if let Some(window) = options.expire_window {
                fields.push(("StoreExpireDate".into(), window.to_string()));
            }
        },
        PaymentChannel::WebAtm | PaymentChannel::ApplePay => {},
    }
    fields
}

//--------------------------------------  Callback parsing   ---------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum CallbackParseError {
    #[error("The callback is missing the {0} field")]
    MissingField(&'static str),
    #[error("The callback field {field} is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
    #[error("The {0} channel does not deliver asynchronous payment info")]
    NotTwoPhase(PaymentChannel),
}

pub(crate) fn req_field<'a>(
    fields: &'a BTreeMap<String, String>,
    name: &'static str,
) -> Result<&'a str, CallbackParseError> {
    fields.get(name).map(String::as_str).ok_or(CallbackParseError::MissingField(name))
}

pub(crate) fn num_field(fields: &BTreeMap<String, String>, name: &'static str) -> Result<i64, CallbackParseError> {
    let raw = req_field(fields, name)?;
    raw.parse().map_err(|_| CallbackParseError::NotNumeric { field: name, value: raw.to_string() })
}

/// Parse a settlement callback's channel-specific fields into the order's `additionalInfo`.
pub fn parse_settlement_info(
    channel: PaymentChannel,
    fields: &BTreeMap<String, String>,
) -> Result<AdditionalInfo, CallbackParseError> {
    let info = match channel {
        PaymentChannel::CreditCard => AdditionalInfo::CreditCard {
            card_last4: req_field(fields, "card4no")?.to_string(),
            card_first6: req_field(fields, "card6no")?.to_string(),
            eci: num_field(fields, "eci")?,
            auth_code: req_field(fields, "auth_code")?.to_string(),
            gwsr: fields.get("gwsr").cloned().unwrap_or_default(),
            process_date: fields.get("process_date").cloned().unwrap_or_default(),
        },
        PaymentChannel::VirtualAccount => AdditionalInfo::VirtualAccount {
            bank_code: req_field(fields, "ATMAccBank")?.to_string(),
            virtual_account: req_field(fields, "ATMAccNo")?.to_string(),
            expire_date: fields.get("ExpireDate").cloned().unwrap_or_default(),
        },
        PaymentChannel::CvsKiosk => AdditionalInfo::CvsKiosk {
            payment_no: req_field(fields, "PaymentNo")?.to_string(),
            expire_date: fields.get("ExpireDate").cloned().unwrap_or_default(),
        },
        PaymentChannel::CvsBarcode => AdditionalInfo::CvsBarcode {
            barcode1: req_field(fields, "Barcode1")?.to_string(),
            barcode2: req_field(fields, "Barcode2")?.to_string(),
            barcode3: req_field(fields, "Barcode3")?.to_string(),
            expire_date: fields.get("ExpireDate").cloned().unwrap_or_default(),
        },
        PaymentChannel::WebAtm => {
            AdditionalInfo::WebAtm { bank_code: fields.get("WebATMAccBank").cloned().unwrap_or_default() }
        },
        PaymentChannel::ApplePay => {
            AdditionalInfo::ApplePay { auth_code: fields.get("auth_code").cloned().unwrap_or_default() }
        },
    };
    Ok(info)
}

/// Parse an info-retrieval callback (two-phase channels only).
pub fn parse_async_info(
    channel: PaymentChannel,
    fields: &BTreeMap<String, String>,
) -> Result<AdditionalInfo, CallbackParseError> {
    let info = match channel {
        PaymentChannel::VirtualAccount => AdditionalInfo::VirtualAccount {
            bank_code: req_field(fields, "BankCode")?.to_string(),
            virtual_account: req_field(fields, "vAccount")?.to_string(),
            expire_date: req_field(fields, "ExpireDate")?.to_string(),
        },
        PaymentChannel::CvsKiosk => AdditionalInfo::CvsKiosk {
            payment_no: req_field(fields, "PaymentNo")?.to_string(),
            expire_date: req_field(fields, "ExpireDate")?.to_string(),
        },
        PaymentChannel::CvsBarcode => AdditionalInfo::CvsBarcode {
            barcode1: req_field(fields, "Barcode1")?.to_string(),
            barcode2: req_field(fields, "Barcode2")?.to_string(),
            barcode3: req_field(fields, "Barcode3")?.to_string(),
            expire_date: req_field(fields, "ExpireDate")?.to_string(),
        },
        c => return Err(CallbackParseError::NotTwoPhase(c)),
    };
    Ok(info)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn amount_bounds_per_channel() {
        let ok = ChannelOptions::default();
        assert!(validate(PaymentChannel::CvsKiosk, Money::from(32), &ok).is_err());
        assert!(validate(PaymentChannel::CvsKiosk, Money::from(33), &ok).is_ok());
        assert!(validate(PaymentChannel::CvsKiosk, Money::from(6_000), &ok).is_ok());
        assert!(validate(PaymentChannel::CvsKiosk, Money::from(6_001), &ok).is_err());

        assert!(validate(PaymentChannel::VirtualAccount, Money::from(10), &ok).is_err());
        assert!(validate(PaymentChannel::VirtualAccount, Money::from(11), &ok).is_ok());
        assert!(validate(PaymentChannel::VirtualAccount, Money::from(49_999), &ok).is_ok());
        assert!(validate(PaymentChannel::VirtualAccount, Money::from(50_000), &ok).is_err());

        assert!(validate(PaymentChannel::CreditCard, Money::from(4), &ok).is_err());
        assert!(validate(PaymentChannel::CreditCard, Money::from(5), &ok).is_ok());
        assert!(validate(PaymentChannel::CreditCard, Money::from(199_999), &ok).is_ok());
        assert!(validate(PaymentChannel::CreditCard, Money::from(200_000), &ok).is_err());

        assert!(validate(PaymentChannel::CvsBarcode, Money::from(16), &ok).is_err());
        assert!(validate(PaymentChannel::CvsBarcode, Money::from(17), &ok).is_ok());
    }

    #[test]
    fn credit_options_rejected_elsewhere() {
        let options = ChannelOptions { redeem: true, ..Default::default() };
        let err = validate(PaymentChannel::VirtualAccount, Money::from(100), &options).unwrap_err();
        assert!(matches!(err, ValidationError::OptionNotSupported { option: "redeem", .. }));
    }

    #[test]
    fn installments_exclude_redeem_and_recurring() {
        let options = ChannelOptions {
            installments: Some(vec![3, 6]),
            redeem: true,
            ..Default::default()
        };
        let err = validate(PaymentChannel::CreditCard, Money::from(1_000), &options).unwrap_err();
        assert!(matches!(err, ValidationError::InstallmentConflict("redeem")));

        let options = ChannelOptions {
            installments: Some(vec![3, 6]),
            recurring: Some(Recurring {
                period_unit: PeriodUnit::Month,
                frequency: 1,
                times: 12,
                amount: Money::from(100),
            }),
            ..Default::default()
        };
        let err = validate(PaymentChannel::CreditCard, Money::from(1_000), &options).unwrap_err();
        assert!(matches!(err, ValidationError::InstallmentConflict("recurring")));
    }

    #[test]
    fn recurring_bounds_depend_on_unit() {
        let recurring = |unit, frequency, times| ChannelOptions {
            recurring: Some(Recurring { period_unit: unit, frequency, times, amount: Money::from(100) }),
            ..Default::default()
        };
        assert!(validate(PaymentChannel::CreditCard, Money::from(100), &recurring(PeriodUnit::Day, 365, 999)).is_ok());
        assert!(validate(PaymentChannel::CreditCard, Money::from(100), &recurring(PeriodUnit::Day, 366, 1)).is_err());
        assert!(validate(PaymentChannel::CreditCard, Money::from(100), &recurring(PeriodUnit::Month, 13, 1)).is_err());
        assert!(validate(PaymentChannel::CreditCard, Money::from(100), &recurring(PeriodUnit::Month, 12, 99)).is_ok());
        assert!(validate(PaymentChannel::CreditCard, Money::from(100), &recurring(PeriodUnit::Year, 1, 10)).is_err());
        assert!(validate(PaymentChannel::CreditCard, Money::from(100), &recurring(PeriodUnit::Year, 1, 9)).is_ok());
    }

    #[test]
    fn expire_window_only_for_two_phase() {
        let options = ChannelOptions { expire_window: Some(7), ..Default::default() };
        assert!(validate(PaymentChannel::WebAtm, Money::from(100), &options).is_err());
        assert!(validate(PaymentChannel::VirtualAccount, Money::from(100), &options).is_ok());
        let options = ChannelOptions { expire_window: Some(61), ..Default::default() };
        let err = validate(PaymentChannel::VirtualAccount, Money::from(100), &options).unwrap_err();
        assert!(matches!(err, ValidationError::ExpiryWindowOutOfBounds { value: 61, .. }));
    }

    #[test]
    fn payment_type_prefix_resolution() {
        assert_eq!(PaymentChannel::from_payment_type("Credit_CreditCard"), Some(PaymentChannel::CreditCard));
        assert_eq!(PaymentChannel::from_payment_type("ATM_LAND"), Some(PaymentChannel::VirtualAccount));
        assert_eq!(PaymentChannel::from_payment_type("CVS_CVS"), Some(PaymentChannel::CvsKiosk));
        assert_eq!(PaymentChannel::from_payment_type("BARCODE_BARCODE"), Some(PaymentChannel::CvsBarcode));
        assert_eq!(PaymentChannel::from_payment_type("WebATM_TAISHIN"), Some(PaymentChannel::WebAtm));
        assert_eq!(PaymentChannel::from_payment_type("EMV_Somthing"), None);
    }

    #[test]
    fn outbound_fields_for_installments() {
        let options = ChannelOptions { installments: Some(vec![3, 6, 12]), ..Default::default() };
        let fields = outbound_fields(PaymentChannel::CreditCard, &options);
        assert!(fields.contains(&("ChoosePayment".into(), "Credit".into())));
        assert!(fields.contains(&("CreditInstallment".into(), "3,6,12".into())));
    }

    #[test]
    fn async_info_rejected_for_single_phase() {
        let fields = BTreeMap::new();
        let err = parse_async_info(PaymentChannel::CreditCard, &fields).unwrap_err();
        assert!(matches!(err, CallbackParseError::NotTwoPhase(PaymentChannel::CreditCard)));
    }
}
