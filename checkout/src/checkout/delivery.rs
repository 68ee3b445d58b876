//! Delivery form and its registration body

use crate::error::CheckoutError;
use crate::types::Delivery;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Required delivery fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryField {
    /// Receiver name
    ReceiverName,
    /// Phone number
    Phone,
    /// Zip code
    ZipCode,
    /// Address line 1
    Address1,
}

impl fmt::Display for DeliveryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReceiverName => "받는 분 이름",
            Self::Phone => "연락처",
            Self::ZipCode => "우편번호",
            Self::Address1 => "주소",
        })
    }
}

/// Delivery form as entered on the checkout page
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryForm {
    /// Receiver name (required)
    pub receiver_name: String,
    /// Phone number (required)
    pub phone: String,
    /// Zip code (required)
    pub zip_code: String,
    /// Address line 1 (required)
    pub address1: String,
    /// Address line 2
    pub address2: String,
    /// Message for the courier
    pub message: String,
}

impl DeliveryForm {
    /// Form prefilled from an already registered delivery
    #[must_use]
    pub fn from_delivery(delivery: &Delivery) -> Self {
        Self {
            receiver_name: delivery.name.clone(),
            phone: delivery.phone_number.clone(),
            zip_code: delivery.zip_code.clone(),
            address1: delivery.address1.clone(),
            address2: delivery.address2.clone().unwrap_or_default(),
            message: delivery.message.clone().unwrap_or_default(),
        }
    }

    /// Checks the required fields and builds the registration body
    ///
    /// Values are trimmed. The first blank required field, in form order, is
    /// reported.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingDeliveryField`] for a blank required field.
    pub fn validate(&self) -> Result<DeliveryRegistration, CheckoutError> {
        let required = |value: &str, field| {
            let value = value.trim();
            if value.is_empty() {
                Err(CheckoutError::MissingDeliveryField(field))
            } else {
                Ok(value.to_string())
            }
        };

        Ok(DeliveryRegistration {
            name: required(&self.receiver_name, DeliveryField::ReceiverName)?,
            phone_number: required(&self.phone, DeliveryField::Phone)?,
            zip_code: required(&self.zip_code, DeliveryField::ZipCode)?,
            address1: required(&self.address1, DeliveryField::Address1)?,
            address2: self.address2.trim().to_string(),
            message: self.message.trim().to_string(),
        })
    }
}

/// Body of the delivery registration call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRegistration {
    /// Address line 1
    pub address1: String,
    /// Address line 2, may be empty
    pub address2: String,
    /// Receiver phone number
    pub phone_number: String,
    /// Zip code
    pub zip_code: String,
    /// Receiver name
    pub name: String,
    /// Message for the courier, may be empty
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filled() -> DeliveryForm {
        DeliveryForm {
            receiver_name: " 홍길동 ".to_string(),
            phone: "010-1234-5678".to_string(),
            zip_code: "06236".to_string(),
            address1: "서울시 강남구 테헤란로 1".to_string(),
            address2: String::new(),
            message: "문 앞에 놓아주세요".to_string(),
        }
    }

    #[test]
    fn valid_form_becomes_registration() {
        let registration = filled().validate().unwrap();

        assert_eq!(
            serde_json::to_value(&registration).unwrap(),
            json!({
                "address1": "서울시 강남구 테헤란로 1",
                "address2": "",
                "phoneNumber": "010-1234-5678",
                "zipCode": "06236",
                "name": "홍길동",
                "message": "문 앞에 놓아주세요"
            })
        );
    }

    #[test]
    fn blank_required_field_is_reported() {
        let form = DeliveryForm {
            zip_code: "   ".to_string(),
            ..filled()
        };

        let error = form.validate().unwrap_err();
        assert_eq!(error, CheckoutError::MissingDeliveryField(DeliveryField::ZipCode));
        assert_eq!(error.to_string(), "우편번호을(를) 입력해주세요.");
    }

    #[test]
    fn optional_fields_may_be_blank() {
        let form = DeliveryForm {
            address2: String::new(),
            message: String::new(),
            ..filled()
        };
        assert!(form.validate().is_ok());
    }
}
